use crate::edge::{Edge, EdgeAttributes};
use crate::math::Rect;
use crate::node::Node;
use crate::routing::{PathFrequency, RouteTable, WeightMatrix};
use crate::topology::Topology;
use crate::vehicle::{Vehicle, VehicleAttributes};
use crate::{EdgeId, EdgeQueues, NodeId, VehicleId, VehicleSet};
use log::debug;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
pub use stats::TripStats;

mod editing;
mod generation;
mod movement;
mod stats;

/// Points closer than this to a node are snapped onto it when editing, in m.
pub const SNAP_DISTANCE: f64 = 10.0; // m

/// A traffic simulation.
///
/// Editing operations leave the simulation untouched and return an edited copy,
/// so a reader can keep using a previous snapshot while a new one is built.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Simulation {
    /// The road network.
    topology: Topology,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The vehicles on each edge, ordered from the end of the edge to its start.
    queues: EdgeQueues,
    /// The vehicles waiting at nodes, in the order they started waiting.
    waiting: Vec<VehicleId>,
    /// The demand between sites.
    weights: WeightMatrix,
    /// The tunable parameters.
    attributes: SimulationAttributes,
    /// The current simulation time in s.
    time: f64,
    /// The simulation time the routes were last recomputed from measured transit times.
    last_route_update: f64,
    /// The cached routes.
    #[cfg_attr(feature = "serde", serde(skip))]
    routes: RouteTable,
    /// Trip counters.
    stats: TripStats,
}

/// The tunable parameters of a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationAttributes {
    /// The speed limit given to edges created by the editor, in m/s.
    pub default_speed_limit: f64,
    /// The number of vehicles each site generates per second, on average.
    pub frequency: f64,
    /// The simulated time between route updates from measured transit times, in s.
    pub route_update_interval: f64,
}

impl Default for SimulationAttributes {
    fn default() -> Self {
        Self {
            default_speed_limit: 50.0 / 3.6,
            frequency: 0.1,
            route_update_interval: 10.0,
        }
    }
}

impl Simulation {
    /// Creates a simulation with no vehicles, where trips between all sites are equally likely.
    pub fn new(topology: Topology, attributes: SimulationAttributes) -> Self {
        Self::create(topology, 0.0, &[], attributes)
    }

    /// Creates a simulation at time `time` with the given vehicles.
    ///
    /// # Panics
    /// If a vehicle refers to a node or edge that is not in the topology,
    /// or is placed outside its edge.
    pub fn create(
        topology: Topology,
        time: f64,
        vehicles: &[VehicleAttributes],
        attributes: SimulationAttributes,
    ) -> Self {
        let weights = WeightMatrix::uniform(topology.sites().collect());
        let mut sim = Self {
            topology,
            vehicles: VehicleSet::with_key(),
            queues: EdgeQueues::new(),
            waiting: vec![],
            weights,
            attributes,
            time,
            last_route_update: time,
            routes: RouteTable::default(),
            stats: TripStats::default(),
        };
        for attribs in vehicles {
            sim.add_vehicle(attribs);
        }
        sim.rebuild_routes();
        sim
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// # Parameters
    /// * `rng` - The source of randomness for vehicle generation
    /// * `dt` - The time step in seconds
    pub fn step(&mut self, rng: &mut impl Rng, dt: f64) {
        assert!(dt.is_finite() && dt > 0.0, "Time step must be positive, got {}", dt);
        self.update_routes();
        self.generate_vehicles(rng, dt);
        self.move_vehicles(dt);
    }

    /// Returns a copy of the simulation advanced by `dt` seconds.
    pub fn stepped(&self, rng: &mut impl Rng, dt: f64) -> Self {
        let mut sim = self.clone();
        sim.step(rng, dt);
        sim
    }

    /// Gets the current simulation time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Gets the road network.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn attributes(&self) -> &SimulationAttributes {
        &self.attributes
    }

    /// The number of vehicles each site generates per second.
    pub fn frequency(&self) -> f64 {
        self.attributes.frequency
    }

    /// The speed limit in m/s given to edges created by the editor.
    pub fn default_speed_limit(&self) -> f64 {
        self.attributes.default_speed_limit
    }

    /// The attributes given to edges created by the editor.
    pub fn default_edge_attributes(&self) -> EdgeAttributes {
        EdgeAttributes::new(self.attributes.default_speed_limit, 0)
    }

    /// Gets the demand between sites.
    pub fn weights(&self) -> &WeightMatrix {
        &self.weights
    }

    /// Gets the trip counters.
    pub fn stats(&self) -> &TripStats {
        &self.stats
    }

    /// Gets the current routes.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The expected vehicles per second between each pair of sites.
    pub fn path_frequencies(&self) -> Vec<PathFrequency> {
        self.weights.path_frequencies(self.attributes.frequency)
    }

    /// Returns an iterator over all the nodes.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.topology.nodes()
    }

    /// Returns an iterator over all the edges.
    pub fn iter_edges(&self) -> impl Iterator<Item = &Edge> {
        self.topology.edges()
    }

    /// Returns an iterator over the IDs of the site nodes.
    pub fn iter_sites(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.topology.sites()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// The number of vehicles in the simulation.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns an iterator over the vehicles on an edge, from the end of the edge to its start.
    pub fn vehicles_on(&self, edge: EdgeId) -> impl Iterator<Item = &Vehicle> {
        self.queues
            .get(edge)
            .into_iter()
            .flatten()
            .map(|id| &self.vehicles[*id])
    }

    /// Returns an iterator over the vehicles waiting at nodes.
    pub fn waiting_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.waiting.iter().map(|id| &self.vehicles[*id])
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// The vehicle directly ahead of the given one on the same edge, if there is one.
    pub fn next_vehicle(&self, id: VehicleId) -> Option<VehicleId> {
        let queue = self.queues.get(self.vehicles.get(id)?.edge_id()?)?;
        let idx = queue.iter().position(|v| *v == id)?;
        idx.checked_sub(1).map(|i| queue[i])
    }

    /// The measured transit time of an edge, in s.
    pub fn transit_time(&self, edge: EdgeId) -> f64 {
        self.topology.edge(edge).transit_time()
    }

    /// The smallest rectangle containing every node, if there are any.
    pub fn map_bounds(&self) -> Option<Rect> {
        self.topology.bounds()
    }

    /// Adds a vehicle to the simulation.
    pub(crate) fn add_vehicle(&mut self, attribs: &VehicleAttributes) -> VehicleId {
        assert!(
            self.topology.contains_node(attribs.departure)
                && self.topology.contains_node(attribs.destination),
            "Vehicle departure and destination must be in the topology"
        );
        let time = self.time;
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::from_attributes(id, attribs, time));
        match attribs.location {
            Some((edge, distance)) => {
                let length = self.topology.edge(edge).length();
                assert!(
                    (0.0..=length).contains(&distance),
                    "Vehicle distance {} is outside the edge",
                    distance
                );
                self.insert_into_queue(id, edge);
            }
            None => self.waiting.push(id),
        }
        id
    }

    /// Inserts a vehicle into an edge's queue, keeping the queue ordered by distance.
    fn insert_into_queue(&mut self, id: VehicleId, edge: EdgeId) {
        let vehicles = &self.vehicles;
        let distance = vehicles[id].distance().unwrap_or(0.0);
        let queue = self
            .queues
            .entry(edge)
            .expect("Edge is not in the topology")
            .or_default();
        let idx = queue
            .iter()
            .position(|v| vehicles[*v].distance().unwrap_or(0.0) < distance)
            .unwrap_or(queue.len());
        queue.insert(idx, id);
    }

    /// Removes a vehicle from the simulation.
    pub(crate) fn remove_vehicle(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.remove(id) {
            match vehicle.edge_id() {
                Some(edge) => {
                    if let Some(queue) = self.queues.get_mut(edge) {
                        queue.retain(|v| *v != id);
                    }
                }
                None => self.waiting.retain(|v| *v != id),
            }
        }
    }

    /// Removes every vehicle matching a predicate, returning how many were removed.
    pub(crate) fn remove_vehicles_where(&mut self, f: impl Fn(&Vehicle) -> bool) -> usize {
        let doomed = self
            .vehicles
            .values()
            .filter(|v| f(v))
            .map(|v| v.id())
            .collect::<Vec<_>>();
        for id in &doomed {
            self.remove_vehicle(*id);
        }
        doomed.len()
    }

    /// Recomputes the routes if the topology changed,
    /// or folds in the measured transit times if it is time to.
    fn update_routes(&mut self) {
        if !self.routes.is_valid() {
            self.rebuild_routes();
        } else if self.time - self.last_route_update >= self.attributes.route_update_interval {
            self.rebuild_routes();
            self.topology.reset_transit_times();
            self.last_route_update = self.time;
        }
    }

    /// Recomputes the routes from the current transit times.
    fn rebuild_routes(&mut self) {
        self.routes = RouteTable::compute(&self.topology);
        debug!("routes rebuilt at t={:.2}", self.time);
    }

    /// Brings derived state back in line with the topology after an edit.
    fn finish_edit(&mut self) {
        self.weights = self.weights.with_sites(self.topology.sites().collect());
        self.queues.retain(|edge, _| self.topology.contains_edge(edge));
        self.routes.invalidate();
        self.rebuild_routes();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::VEHICLE_LENGTH;
    use crate::math::Point2d;
    use crate::node::NodeKind;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Two sites joined by a single 100 m edge at 10 m/s.
    fn single_edge() -> (Topology, NodeId, NodeId, EdgeId) {
        let mut topo = Topology::new();
        let a = topo.add_node(Point2d::new(0.0, 0.0), NodeKind::Site);
        let b = topo.add_node(Point2d::new(100.0, 0.0), NodeKind::Site);
        let ab = topo.add_edge(a, b, &EdgeAttributes::new(10.0, 0));
        (topo, a, b, ab)
    }

    fn on_edge(a: NodeId, b: NodeId, edge: EdgeId, distance: f64) -> VehicleAttributes {
        VehicleAttributes {
            departure: a,
            destination: b,
            creation_time: 0.0,
            returning: false,
            location: Some((edge, distance)),
        }
    }

    fn quiet() -> SimulationAttributes {
        SimulationAttributes {
            frequency: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn queue_is_ordered_by_distance() {
        let (topo, a, b, ab) = single_edge();
        let sim = Simulation::create(
            topo,
            0.0,
            &[
                on_edge(a, b, ab, 10.0),
                on_edge(a, b, ab, 50.0),
                on_edge(a, b, ab, 30.0),
            ],
            quiet(),
        );
        let distances = sim
            .vehicles_on(ab)
            .map(|v| v.distance().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(distances, vec![50.0, 30.0, 10.0]);

        let ids = sim.vehicles_on(ab).map(|v| v.id()).collect::<Vec<_>>();
        assert_eq!(sim.next_vehicle(ids[0]), None);
        assert_eq!(sim.next_vehicle(ids[1]), Some(ids[0]));
        assert_eq!(sim.next_vehicle(ids[2]), Some(ids[1]));
    }

    #[test]
    fn follower_relaxes_towards_leader() {
        let (topo, a, b, ab) = single_edge();
        let mut sim = Simulation::create(
            topo,
            0.0,
            &[on_edge(a, b, ab, 10.0), on_edge(a, b, ab, 20.0)],
            quiet(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        sim.step(&mut rng, 0.1);

        let distances = sim
            .vehicles_on(ab)
            .map(|v| v.distance().unwrap())
            .collect::<Vec<_>>();
        assert_approx_eq!(distances[0], 21.0);
        assert_approx_eq!(distances[1] - 10.0, (10.0 - VEHICLE_LENGTH) / (1.0 + 1.0 / 0.1));
        assert_approx_eq!(distances[1] - 10.0, 0.5, 0.1);
        assert_approx_eq!(sim.time(), 0.1);
    }

    #[test]
    fn vehicle_at_destination_turns_back() {
        let (mut topo, a, b, ab) = single_edge();
        let ba = topo.add_edge(b, a, &EdgeAttributes::new(10.0, 0));
        let mut sim = Simulation::create(topo, 0.0, &[on_edge(a, b, ab, 95.0)], quiet());
        let mut rng = StdRng::seed_from_u64(0);
        sim.step(&mut rng, 1.0);

        // 0.5 s to reach the end, then straight onto the way back
        let vehicle = sim.iter_vehicles().next().unwrap();
        assert!(vehicle.is_returning());
        assert_eq!(vehicle.edge_id(), Some(ba));
        assert_approx_eq!(vehicle.distance().unwrap(), 5.0);
        assert_approx_eq!(sim.transit_time(ab), 10.0);
    }

    #[test]
    fn unroutable_vehicle_is_removed() {
        let (topo, a, b, ab) = single_edge();
        let mut sim = Simulation::create(topo, 0.0, &[on_edge(a, b, ab, 95.0)], quiet());
        let mut rng = StdRng::seed_from_u64(0);
        sim.step(&mut rng, 1.0);

        // There is no way back from b to a
        assert_eq!(sim.vehicle_count(), 0);
        assert_eq!(sim.stats().abandoned, 1);
    }

    #[test]
    fn stepped_keeps_the_previous_snapshot() {
        let (topo, a, b, ab) = single_edge();
        let sim = Simulation::create(topo, 0.0, &[on_edge(a, b, ab, 0.0)], quiet());
        let mut rng = StdRng::seed_from_u64(0);
        let next = sim.stepped(&mut rng, 1.0);
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.iter_vehicles().next().unwrap().distance(), Some(0.0));
        assert_approx_eq!(next.iter_vehicles().next().unwrap().distance().unwrap(), 10.0);
    }
}
