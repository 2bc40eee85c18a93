use super::{Simulation, SNAP_DISTANCE};
use crate::edge::{EdgeAttributes, VEHICLE_LENGTH};
use crate::math::{Point2d, Transform2d, Vector2d};
use crate::module::MapModule;
use crate::node::NodeKind;
use crate::routing::WeightMatrix;
use crate::vehicle::VehicleState;
use crate::{EdgeId, NodeId, VehicleId};
use arrayvec::ArrayVec;
use cgmath::prelude::*;
use log::debug;
use std::collections::VecDeque;

/// A crossing that only chains edges together, with the edges to merge across it.
struct ChainNode {
    node: NodeId,
    /// Pairs of `(incoming, outgoing)` edges to merge.
    pairs: ArrayVec<(EdgeId, EdgeId), 2>,
}

impl Simulation {
    /// Returns a copy of the simulation with a new node, and the node's ID.
    pub fn add_node(&self, location: Point2d, kind: NodeKind) -> (Self, NodeId) {
        let mut sim = self.clone();
        let id = sim.topology.add_node(location, kind);
        debug!("added {:?} node {:?}", kind, id);
        sim.finish_edit();
        (sim, id)
    }

    /// Returns a copy of the simulation with a new edge from `begin` to `end`, and the edge's ID.
    ///
    /// # Panics
    /// If either node is not in the network, or the edge is invalid.
    pub fn add_edge(&self, begin: NodeId, end: NodeId, attribs: &EdgeAttributes) -> (Self, EdgeId) {
        let mut sim = self.clone();
        let id = sim.topology.add_edge(begin, end, attribs);
        debug!("added edge {:?} from {:?} to {:?}", id, begin, end);
        sim.finish_edit();
        (sim, id)
    }

    /// Returns a copy of the simulation with an edge between two points.
    ///
    /// Each end point snaps to the closest node within [SNAP_DISTANCE],
    /// or becomes a new crossing if there is none.
    pub fn connect(&self, from: Point2d, to: Point2d, attribs: &EdgeAttributes) -> (Self, EdgeId) {
        let mut sim = self.clone();
        let begin = sim.snap_or_add(from);
        let end = sim.snap_or_add(to);
        let id = sim.topology.add_edge(begin, end, attribs);
        debug!("connected {:?} to {:?} with edge {:?}", begin, end, id);
        sim.finish_edit();
        (sim, id)
    }

    /// Returns a copy of the simulation without the given edge.
    /// Vehicles on the edge are removed.
    ///
    /// # Panics
    /// If the edge is not in the network.
    pub fn remove_edge(&self, edge: EdgeId) -> Self {
        let mut sim = self.clone();
        sim.topology.remove_edge(edge);
        let removed = sim.remove_vehicles_where(|v| v.edge_id() == Some(edge));
        debug!("removed edge {:?} and {} vehicles", edge, removed);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation where an edge has new attributes.
    /// Vehicles on the edge keep their position.
    ///
    /// # Panics
    /// If the edge is not in the network.
    pub fn change_edge(&self, edge: EdgeId, attribs: &EdgeAttributes) -> Self {
        let mut sim = self.clone();
        sim.topology.set_edge_attributes(edge, attribs);
        debug!("changed edge {:?} to {:?}", edge, attribs);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation where a node has switched between site and crossing.
    ///
    /// Edges touching the node are kept. If the node stops being a site,
    /// vehicles travelling from or to it are removed.
    ///
    /// # Panics
    /// If the node is not in the network.
    pub fn change_node(&self, node: NodeId) -> Self {
        let mut sim = self.clone();
        let kind = sim.topology.node(node).kind().toggled();
        sim.topology.set_node_kind(node, kind);
        let removed = match kind {
            NodeKind::Crossing => sim.remove_vehicles_where(|v| v.departure() == node || v.destination() == node),
            NodeKind::Site => 0,
        };
        debug!("node {:?} is now a {:?}, removed {} vehicles", node, kind, removed);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation without the given node or the edges touching it.
    ///
    /// Vehicles on those edges, waiting at the node, or travelling from or to it are removed.
    ///
    /// # Panics
    /// If the node is not in the network.
    pub fn remove_node(&self, node: NodeId) -> Self {
        let mut sim = self.clone();
        assert!(sim.topology.contains_node(node), "Node is not in the topology");
        let edges = sim.topology.incident_edges(node).collect::<Vec<_>>();
        let removed = sim.remove_vehicles_where(|v| {
            v.departure() == node
                || v.destination() == node
                || v.waiting_node() == Some(node)
                || v.edge_id().map(|e| edges.contains(&e)).unwrap_or(false)
        });
        sim.topology.remove_node(node);
        debug!("removed {} vehicles with node {:?}", removed, node);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation with a module placed into it.
    ///
    /// The module's origin is placed at `anchor` and its x-axis is turned to `direction`.
    /// The module is also scaled by the length of `direction`, so a unit vector keeps its size.
    /// Module nodes within [SNAP_DISTANCE] of an existing node are merged into it.
    /// Edges that would duplicate an existing edge, or that collapse onto a single node, are skipped.
    pub fn add_module(&self, module: &MapModule, anchor: Point2d, direction: Vector2d) -> Self {
        let mut sim = self.clone();
        let transform = Transform2d::new(anchor, direction);
        let nodes = module
            .nodes()
            .iter()
            .map(|loc| sim.snap_or_add(transform.apply(*loc)))
            .collect::<Vec<_>>();

        let mut added = 0;
        for edge in module.edges() {
            let (begin, end) = (nodes[edge.begin], nodes[edge.end]);
            if begin == end || sim.topology.find_edge(begin, end).is_some() {
                continue;
            }
            let length = sim
                .topology
                .node(begin)
                .location()
                .distance(sim.topology.node(end).location());
            if length <= VEHICLE_LENGTH {
                continue;
            }
            sim.topology.add_edge(begin, end, &edge.attributes);
            added += 1;
        }
        debug!("added module with {} edges at {:?}", added, anchor);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation where crossings that only chain two edges together
    /// are removed, and each chain is replaced by a single straight edge.
    ///
    /// Merged edges take the speed limit `speed_limit`, lowered to what is safe for their length,
    /// and the priority of the edge leaving the removed crossing. Vehicles keep their position
    /// along the chain, scaled to the length of the merged edge.
    pub fn optimize(&self, speed_limit: f64) -> Self {
        let mut sim = self.clone();
        let mut merged = 0;
        while let Some(chain) = sim.find_chain_node() {
            sim.merge_chain(chain, speed_limit);
            merged += 1;
        }
        sim.topology.reset_transit_times();
        debug!("optimized away {} nodes", merged);
        sim.finish_edit();
        sim
    }

    /// Returns a copy of the simulation with every node moved by `offset`.
    pub fn set_offset(&self, offset: Vector2d) -> Self {
        let mut sim = self.clone();
        sim.topology.translate(offset);
        sim
    }

    /// Returns a copy of the simulation with new trip weights.
    /// Weights for sites the simulation does not have are ignored,
    /// and sites missing from `weights` get zero weights.
    pub fn set_weights(&self, weights: &WeightMatrix) -> Self {
        let mut sim = self.clone();
        sim.weights = weights.with_sites(sim.topology.sites().collect());
        sim
    }

    /// Returns a copy of the simulation generating `frequency` vehicles per site per second.
    ///
    /// # Panics
    /// If the frequency is negative or not finite.
    pub fn set_frequency(&self, frequency: f64) -> Self {
        assert!(
            frequency.is_finite() && frequency >= 0.0,
            "Frequency must be a non-negative number, got {}",
            frequency
        );
        let mut sim = self.clone();
        sim.attributes.frequency = frequency;
        sim
    }

    /// Returns a copy of the simulation with a new default speed limit for edited edges, in m/s.
    pub fn set_default_speed_limit(&self, speed_limit: f64) -> Self {
        assert!(
            speed_limit.is_finite() && speed_limit > 0.0,
            "Speed limit must be positive, got {}",
            speed_limit
        );
        let mut sim = self.clone();
        sim.attributes.default_speed_limit = speed_limit;
        sim
    }

    /// The closest node within [SNAP_DISTANCE] of a point, or a new crossing there.
    fn snap_or_add(&mut self, point: Point2d) -> NodeId {
        self.topology
            .find_node_near(point, SNAP_DISTANCE)
            .unwrap_or_else(|| self.topology.add_node(point, NodeKind::Crossing))
    }

    /// Finds a crossing with one or two incoming edges that each continue to
    /// a different neighbour, and can be merged with that continuation.
    fn find_chain_node(&self) -> Option<ChainNode> {
        let topo = &self.topology;
        topo.nodes().filter(|n| !n.is_site()).find_map(|node| {
            let (incoming, outgoing) = (topo.incoming(node.id()), topo.outgoing(node.id()));
            if incoming.is_empty() || incoming.len() > 2 || incoming.len() != outgoing.len() {
                return None;
            }

            let sources = incoming.iter().map(|e| topo.edge(*e).begin()).collect::<ArrayVec<_, 2>>();
            let targets = outgoing.iter().map(|e| topo.edge(*e).end()).collect::<ArrayVec<_, 2>>();
            let mut neighbours = sources.iter().chain(targets.iter()).copied().collect::<Vec<_>>();
            neighbours.sort();
            neighbours.dedup();
            if neighbours.len() != 2 {
                return None;
            }
            if sources.len() == 2 && (sources[0] == sources[1] || targets[0] == targets[1]) {
                return None;
            }

            let mut pairs = ArrayVec::new();
            for (e_in, source) in incoming.iter().zip(&sources) {
                let (e_out, target) = outgoing
                    .iter()
                    .zip(&targets)
                    .find(|(_, target)| *target != source)?;
                let length = topo
                    .node(*source)
                    .location()
                    .distance(topo.node(*target).location());
                if topo.find_edge(*source, *target).is_some() || length <= VEHICLE_LENGTH {
                    return None;
                }
                pairs.push((*e_in, *e_out));
            }
            Some(ChainNode {
                node: node.id(),
                pairs,
            })
        })
    }

    /// Replaces each pair of edges through a chain node with one edge, then removes the node.
    fn merge_chain(&mut self, chain: ChainNode, speed_limit: f64) {
        let node = chain.node;
        for (e_in, e_out) in chain.pairs {
            let (edge_in, edge_out) = (self.topology.edge(e_in).clone(), self.topology.edge(e_out).clone());
            let merged_id = self.topology.add_edge(
                edge_in.begin(),
                edge_out.end(),
                &EdgeAttributes::new(speed_limit, edge_out.priority()),
            );
            let merged_len = self.topology.edge(merged_id).length();
            let scale = merged_len / (edge_in.length() + edge_out.length());

            // Positions along the chain, from the end of the chain back to its start
            let mut moved: Vec<(VehicleId, f64)> = vec![];
            let on_edge = |queue: Option<&VecDeque<VehicleId>>, offset: f64| {
                queue
                    .into_iter()
                    .flatten()
                    .map(|id| (*id, offset + self.vehicles[*id].distance().unwrap_or(0.0)))
                    .collect::<Vec<_>>()
            };
            moved.extend(on_edge(self.queues.get(e_out), edge_in.length()));
            moved.extend(self.waiting.iter().copied().filter_map(|id| match *self.vehicles[id].state() {
                VehicleState::Waiting {
                    node: n,
                    arrived_from: Some(e),
                } if n == node && e == e_in => Some((id, edge_in.length())),
                _ => None,
            }));
            moved.extend(on_edge(self.queues.get(e_in), 0.0));

            let mut queue = VecDeque::with_capacity(moved.len());
            for (id, position) in moved {
                let distance = f64::min(position * scale, merged_len);
                self.vehicles[id].set_location(merged_id, distance, self.time);
                queue.push_back(id);
            }
            self.waiting.retain(|id| !queue.contains(id));
            for id in &self.waiting {
                self.vehicles[*id].replace_arrival_edge(e_out, merged_id);
            }
            self.queues.remove(e_in);
            self.queues.remove(e_out);
            self.queues.insert(merged_id, queue);
            debug!("merged edges {:?} and {:?} into {:?}", e_in, e_out, merged_id);
        }

        self.remove_vehicles_where(|v| v.waiting_node() == Some(node));
        self.topology.remove_node(node);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::priority::Junctions;
    use crate::simulation::SimulationAttributes;
    use crate::topology::Topology;
    use crate::vehicle::VehicleAttributes;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet() -> SimulationAttributes {
        SimulationAttributes {
            frequency: 0.0,
            ..Default::default()
        }
    }

    /// Two sites joined through a crossing in the middle, in both directions.
    struct Chain {
        sim: Simulation,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        ab: EdgeId,
        bc: EdgeId,
    }

    fn chain(bend: f64) -> Chain {
        let attribs = EdgeAttributes::new(10.0, 0);
        let mut topo = Topology::new();
        let a = topo.add_node(Point2d::new(0.0, 0.0), NodeKind::Site);
        let b = topo.add_node(Point2d::new(100.0, bend), NodeKind::Crossing);
        let c = topo.add_node(Point2d::new(200.0, 0.0), NodeKind::Site);
        let ab = topo.add_edge(a, b, &attribs);
        let bc = topo.add_edge(b, c, &attribs);
        topo.add_edge(c, b, &attribs);
        topo.add_edge(b, a, &attribs);
        let vehicle = |edge, distance| VehicleAttributes {
            departure: a,
            destination: c,
            creation_time: 0.0,
            returning: false,
            location: Some((edge, distance)),
        };
        let sim = Simulation::create(topo, 0.0, &[vehicle(ab, 50.0), vehicle(bc, 20.0)], quiet());
        Chain { sim, a, b, c, ab, bc }
    }

    fn positions(sim: &Simulation) -> Vec<(EdgeId, f64)> {
        let mut positions = sim
            .iter_vehicles()
            .map(|v| (v.edge_id().unwrap(), v.distance().unwrap()))
            .collect::<Vec<_>>();
        positions.sort_by(|a, b| a.1.total_cmp(&b.1));
        positions
    }

    #[test]
    fn optimize_merges_a_straight_chain() {
        let Chain { sim, a, b, c, .. } = chain(0.0);
        let sim = sim.optimize(20.0);

        assert!(!sim.topology().contains_node(b));
        assert_eq!(sim.topology().node_count(), 2);
        assert_eq!(sim.topology().edge_count(), 2);
        let ac = sim.topology().find_edge(a, c).unwrap();
        assert!(sim.topology().find_edge(c, a).is_some());
        assert_approx_eq!(sim.topology().edge(ac).length(), 200.0);
        assert_approx_eq!(sim.topology().edge(ac).speed_limit(), 20.0);

        let positions = positions(&sim);
        assert_eq!(positions.len(), 2);
        assert!(positions.iter().all(|(e, _)| *e == ac));
        assert_approx_eq!(positions[0].1, 50.0);
        assert_approx_eq!(positions[1].1, 120.0);

        let ids = sim.vehicles_on(ac).map(|v| v.distance().unwrap()).collect::<Vec<_>>();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] > ids[1]);
    }

    #[test]
    fn optimize_scales_positions_around_a_bend() {
        let Chain { sim, .. } = chain(50.0);
        let chain_len = 2.0 * f64::hypot(100.0, 50.0);
        let sim = sim.optimize(10.0);

        let positions = positions(&sim);
        assert_approx_eq!(positions[0].1, 50.0 * 200.0 / chain_len);
        assert_approx_eq!(positions[1].1, (chain_len / 2.0 + 20.0) * 200.0 / chain_len);
    }

    #[test]
    fn optimize_is_idempotent() {
        let Chain { sim, .. } = chain(0.0);
        let once = sim.optimize(15.0);
        let twice = once.optimize(15.0);

        assert_eq!(once.topology().node_count(), twice.topology().node_count());
        let edges = |sim: &Simulation| {
            let mut edges = sim.iter_edges().cloned().collect::<Vec<_>>();
            edges.sort_by_key(|e| e.id());
            edges
        };
        assert_eq!(edges(&once), edges(&twice));
        assert_eq!(positions(&once), positions(&twice));
    }

    #[test]
    fn optimize_keeps_sites_and_junctions() {
        let Chain { sim, a, b, .. } = chain(0.0);
        let (sim, d) = sim.add_node(Point2d::new(100.0, 100.0), NodeKind::Site);
        let (sim, _) = sim.add_edge(b, d, &EdgeAttributes::new(10.0, 0));
        let optimized = sim.optimize(10.0);
        assert_eq!(optimized.topology().node_count(), 4);
        assert!(optimized.topology().contains_node(a));
    }

    #[test]
    fn change_node_round_trip() {
        let Chain { sim, b, ab, bc, .. } = chain(0.0);
        let site = sim.change_node(b);
        assert!(site.topology().node(b).is_site());
        assert_eq!(site.weights().len(), 3);

        let back = site.change_node(b);
        assert!(!back.topology().node(b).is_site());
        assert_eq!(back.weights().len(), 2);
        assert_eq!(positions(&back), positions(&sim));
        assert_eq!(back.topology().edge(ab), sim.topology().edge(ab));
        assert_eq!(back.topology().edge(bc), sim.topology().edge(bc));
    }

    #[test]
    fn demoted_site_loses_its_vehicles() {
        let Chain { sim, c, .. } = chain(0.0);
        let sim = sim.change_node(c);
        assert_eq!(sim.vehicle_count(), 0);
        assert_eq!(sim.weights().len(), 1);
    }

    #[test]
    fn remove_edge_drops_its_vehicles() {
        let Chain { sim, ab, bc, .. } = chain(0.0);
        let sim = sim.remove_edge(ab);
        assert!(!sim.topology().contains_edge(ab));
        assert_eq!(sim.vehicle_count(), 1);
        assert_eq!(sim.vehicles_on(bc).count(), 1);
    }

    #[test]
    fn remove_node_drops_dependent_vehicles() {
        let Chain { sim, b, .. } = chain(0.0);
        let sim = sim.remove_node(b);
        assert_eq!(sim.topology().node_count(), 2);
        assert_eq!(sim.topology().edge_count(), 0);
        assert_eq!(sim.vehicle_count(), 0);
        assert!(sim.routes().is_empty());
    }

    #[test]
    fn change_edge_keeps_positions() {
        let Chain { sim, ab, .. } = chain(0.0);
        let sim = sim.change_edge(ab, &EdgeAttributes::new(5.0, 3));
        let edge = sim.topology().edge(ab);
        assert_eq!(edge.speed_limit(), 5.0);
        assert_eq!(edge.priority(), 3);
        assert_approx_eq!(edge.transit_time(), 20.0);
        assert_eq!(sim.vehicles_on(ab).next().unwrap().distance(), Some(50.0));
    }

    #[test]
    fn connect_snaps_to_nearby_nodes() {
        let Chain { sim, a, c, .. } = chain(0.0);
        let attribs = sim.default_edge_attributes();
        let (sim, edge) = sim.connect(Point2d::new(3.0, 4.0), Point2d::new(100.0, -100.0), &attribs);
        assert_eq!(sim.topology().edge(edge).begin(), a);
        assert_eq!(sim.topology().node_count(), 4);
        assert!(sim.routes().next_edge(a, c).is_some());
    }

    #[test]
    fn modules_splice_onto_existing_nodes() {
        let sim = Simulation::new(Topology::new(), quiet());
        let cross = MapModule::cross(100.0, 10.0);
        let sim = sim.add_module(&cross, Point2d::new(0.0, 0.0), Vector2d::new(1.0, 0.0));
        assert_eq!(sim.topology().node_count(), 5);
        assert_eq!(sim.topology().edge_count(), 8);

        // The second cross shares its west arm end with the first's east arm end
        let sim = sim.add_module(&cross, Point2d::new(203.0, 0.0), Vector2d::new(0.0, 1.0));
        assert_eq!(sim.topology().node_count(), 9);
        assert_eq!(sim.topology().edge_count(), 16);
        assert!(sim.topology().find_node_near(Point2d::new(203.0, 100.0), 1e-6).is_some());
    }

    #[test]
    fn offset_moves_nodes_not_vehicles() {
        let Chain { sim, a, ab, .. } = chain(0.0);
        let moved = sim.set_offset(Vector2d::new(10.0, -5.0));
        assert_eq!(moved.topology().node(a).location(), Point2d::new(10.0, -5.0));
        assert_eq!(positions(&moved), positions(&sim));
        assert_approx_eq!(moved.topology().edge(ab).length(), 100.0);
    }

    #[test]
    fn weights_follow_the_sites() {
        let Chain { sim, a, c, .. } = chain(0.0);
        let weights = WeightMatrix::from_rows(vec![c, a], &[vec![0.0, 2.0], vec![3.0, 0.0]]);
        let sim = sim.set_weights(&weights).set_frequency(0.5);
        assert_eq!(sim.weights().weight(a, c), 3.0);
        assert_eq!(sim.weights().weight(c, a), 2.0);
        assert_eq!(sim.frequency(), 0.5);
        let paths = sim.path_frequencies();
        assert_eq!(paths.len(), 1);
        assert_approx_eq!(paths[0].frequency, 1.0);
    }

    /// A major road a -> b -> c and a minor road e -> c, both continuing to d.
    /// One vehicle waits at c, having arrived along the major road, for room behind
    /// another that has just entered c -> d. A minor road vehicle is 12 m from c.
    struct Junction {
        sim: Simulation,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        e: NodeId,
        bc: EdgeId,
        cd: EdgeId,
        waiting: VehicleId,
        ahead: VehicleId,
    }

    fn waiting_at_junction() -> Junction {
        let major = EdgeAttributes::new(10.0, 1);
        let minor = EdgeAttributes::new(10.0, 0);
        let mut topo = Topology::new();
        let a = topo.add_node(Point2d::new(0.0, 0.0), NodeKind::Site);
        let b = topo.add_node(Point2d::new(100.0, 0.0), NodeKind::Crossing);
        let c = topo.add_node(Point2d::new(200.0, 0.0), NodeKind::Crossing);
        let d = topo.add_node(Point2d::new(300.0, 0.0), NodeKind::Site);
        let e = topo.add_node(Point2d::new(200.0, -100.0), NodeKind::Site);
        topo.add_edge(a, b, &major);
        let bc = topo.add_edge(b, c, &major);
        let ec = topo.add_edge(e, c, &minor);
        let cd = topo.add_edge(c, d, &minor);
        let vehicle = |departure, edge, distance| VehicleAttributes {
            departure,
            destination: d,
            creation_time: 0.0,
            returning: false,
            location: Some((edge, distance)),
        };
        let mut sim = Simulation::create(
            topo,
            0.0,
            &[vehicle(a, bc, 99.95), vehicle(a, cd, 0.0), vehicle(e, ec, 88.0)],
            quiet(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        sim.step(&mut rng, 0.01);

        let waiting = sim.waiting_vehicles().next().unwrap().id();
        assert_eq!(sim.vehicles[waiting].waiting_node(), Some(c));
        let ahead = sim.vehicles_on(cd).next().unwrap().id();
        Junction {
            sim,
            a,
            b,
            c,
            e,
            bc,
            cd,
            waiting,
            ahead,
        }
    }

    /// The edge a waiting vehicle arrived along and the priority it crosses with.
    fn arrival(sim: &Simulation, id: VehicleId) -> (Option<EdgeId>, i32) {
        let arrived_from = match *sim.vehicles[id].state() {
            VehicleState::Waiting { arrived_from, .. } => arrived_from,
            VehicleState::Transiting { .. } => panic!("vehicle {:?} is not waiting", id),
        };
        let junctions = Junctions::new(&sim.topology, &sim.queues, &sim.vehicles);
        (arrived_from, junctions.priority(arrived_from))
    }

    /// Where the first vehicle to join `ahead` on `edge` came from.
    fn next_onto(mut sim: Simulation, edge: EdgeId, ahead: VehicleId) -> NodeId {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..500 {
            sim.step(&mut rng, 0.01);
            if let Some(vehicle) = sim.vehicles_on(edge).find(|v| v.id() != ahead) {
                return vehicle.departure();
            }
        }
        panic!("nobody entered {:?}", edge);
    }

    #[test]
    fn waiting_vehicle_has_right_of_way() {
        let j = waiting_at_junction();
        assert_eq!(arrival(&j.sim, j.waiting), (Some(j.bc), 1));
        assert_eq!(next_onto(j.sim, j.cd, j.ahead), j.a);
    }

    #[test]
    fn optimize_keeps_right_of_way_of_waiting_vehicles() {
        let j = waiting_at_junction();
        let sim = j.sim.optimize(10.0);
        assert!(!sim.topology().contains_node(j.b));
        let ac = sim.topology().find_edge(j.a, j.c).unwrap();

        assert_eq!(sim.vehicles[j.waiting].waiting_node(), Some(j.c));
        assert_eq!(arrival(&sim, j.waiting), (Some(ac), 1));
        let view = sim
            .vehicle_views()
            .into_iter()
            .find(|v| v.id == j.waiting)
            .unwrap();
        assert_approx_eq!(view.direction.x, 1.0);

        // The minor road vehicle still gives way
        assert_eq!(next_onto(sim, j.cd, j.ahead), j.a);
    }

    #[test]
    fn node_and_edge_changes_keep_waiting_vehicles() {
        let j = waiting_at_junction();

        let sim = j.sim.change_node(j.c);
        assert_eq!(sim.vehicles[j.waiting].waiting_node(), Some(j.c));
        assert_eq!(arrival(&sim, j.waiting), (Some(j.bc), 1));

        let sim = j.sim.change_edge(j.bc, &EdgeAttributes::new(10.0, 2));
        assert_eq!(arrival(&sim, j.waiting), (Some(j.bc), 2));

        // Without its arrival edge the vehicle stays, yielding to everyone
        let sim = j.sim.remove_edge(j.bc);
        assert_eq!(sim.vehicle_count(), 3);
        assert_eq!(arrival(&sim, j.waiting), (Some(j.bc), i32::MIN));
        assert_eq!(next_onto(sim, j.cd, j.ahead), j.e);
    }
}
