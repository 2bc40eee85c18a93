pub use cgmath;
pub use edge::{max_safe_speed, Edge, EdgeAttributes, REACTION_TIME, VEHICLE_LENGTH};
pub use module::{MapModule, ModuleEdge};
pub use node::{Node, NodeKind};
pub use render::{EdgeTraffic, VehicleView};
pub use routing::{PathFrequency, RouteTable, WeightMatrix};
pub use simulation::{Simulation, SimulationAttributes, TripStats, SNAP_DISTANCE};
use slotmap::{new_key_type, SecondaryMap, SlotMap};
pub use slotmap::{Key, KeyData};
use std::collections::VecDeque;
pub use topology::Topology;
pub use util::Interval;
pub use vehicle::{Arrival, Vehicle, VehicleAttributes, VehicleState};

mod edge;
pub mod math;
mod module;
mod node;
mod priority;
mod render;
mod routing;
mod simulation;
mod topology;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Node].
    pub struct NodeId;
    /// Unique ID of an [Edge].
    pub struct EdgeId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
type EdgeQueues = SecondaryMap<EdgeId, VecDeque<VehicleId>>;
