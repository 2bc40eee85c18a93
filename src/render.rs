use crate::edge::VEHICLE_LENGTH;
use crate::math::{Point2d, Vector2d};
use crate::simulation::Simulation;
use crate::util::Interval;
use crate::vehicle::VehicleState;
use crate::{EdgeId, NodeId, VehicleId};

/// Where to draw a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    /// The world space location of the front of the vehicle.
    pub location: Point2d,
    /// A unit vector in the direction of travel, or zero for a vehicle
    /// waiting at the site it was created at.
    pub direction: Vector2d,
    /// The site the vehicle is heading to.
    pub target: NodeId,
    /// Whether the vehicle is on its way home.
    pub returning: bool,
}

/// How busy an edge is, for colouring a heat map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeTraffic {
    pub edge: EdgeId,
    /// The number of vehicles on the edge.
    pub vehicles: usize,
    /// The fraction of the edge covered by vehicles, from 0 to 1.
    pub density: f64,
    /// How much slower than free flow the edge is, from 0 (free flow) to 1 (stopped).
    pub congestion: f64,
}

impl Simulation {
    /// Gets the drawing information of every vehicle.
    pub fn vehicle_views(&self) -> Vec<VehicleView> {
        let topo = self.topology();
        self.iter_vehicles()
            .map(|vehicle| {
                let (location, direction) = match *vehicle.state() {
                    VehicleState::Transiting { edge, distance, .. } => {
                        let edge = topo.edge(edge);
                        (edge.location_at(distance), edge.direction())
                    }
                    VehicleState::Waiting { node, arrived_from } => {
                        let direction = arrived_from
                            .and_then(|e| topo.get_edge(e))
                            .map(|e| e.direction())
                            .unwrap_or(Vector2d::new(0.0, 0.0));
                        (topo.node(node).location(), direction)
                    }
                };
                VehicleView {
                    id: vehicle.id(),
                    location,
                    direction,
                    target: vehicle.current_destination(),
                    returning: vehicle.is_returning(),
                }
            })
            .collect()
    }

    /// Gets the traffic level of every edge.
    pub fn edge_traffic(&self) -> Vec<EdgeTraffic> {
        let unit = Interval::new(0.0, 1.0);
        self.iter_edges()
            .map(|edge| {
                let vehicles = self.vehicles_on(edge.id()).count();
                let density = unit.clamp(vehicles as f64 * VEHICLE_LENGTH / edge.length());
                let congestion = unit.clamp(1.0 - edge.free_flow_time() / edge.transit_time());
                EdgeTraffic {
                    edge: edge.id(),
                    vehicles,
                    density,
                    congestion,
                }
            })
            .collect()
    }
}
