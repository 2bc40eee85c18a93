use crate::edge::VEHICLE_LENGTH;
use crate::topology::Topology;
use crate::{EdgeId, EdgeQueues, NodeId, VehicleSet};

/// The priority of a vehicle that did not arrive at its node along an edge.
const SOURCE_PRIORITY: i32 = i32::MIN;

/// Right-of-way rules at the nodes of the network.
///
/// Every edge converging on a node conflicts with every other edge converging on it.
pub(crate) struct Junctions<'a> {
    topology: &'a Topology,
    queues: &'a EdgeQueues,
    vehicles: &'a VehicleSet,
}

impl<'a> Junctions<'a> {
    pub fn new(topology: &'a Topology, queues: &'a EdgeQueues, vehicles: &'a VehicleSet) -> Self {
        Self {
            topology,
            queues,
            vehicles,
        }
    }

    /// The priority of a vehicle that arrived along `arrived_from`.
    /// An edge removed since the vehicle arrived counts as no edge.
    pub fn priority(&self, arrived_from: Option<EdgeId>) -> i32 {
        arrived_from
            .and_then(|e| self.topology.get_edge(e))
            .map(|e| e.priority())
            .unwrap_or(SOURCE_PRIORITY)
    }

    /// Whether the leading vehicle on an edge is within the edge's safety distance of its end.
    pub fn is_approaching(&self, edge: EdgeId) -> bool {
        let edge = self.topology.edge(edge);
        self.queues
            .get(edge.id())
            .and_then(|q| q.front())
            .and_then(|id| self.vehicles[*id].distance())
            .map(|distance| edge.length() - distance <= edge.safety_distance())
            .unwrap_or(false)
    }

    /// Whether an edge has space for a vehicle to enter.
    pub fn has_entry_room(&self, edge: EdgeId) -> bool {
        self.queues
            .get(edge)
            .and_then(|q| q.back())
            .and_then(|id| self.vehicles[*id].distance())
            .map(|distance| distance >= VEHICLE_LENGTH)
            .unwrap_or(true)
    }

    /// Whether a vehicle waiting at `node` may cross it.
    /// It must give way to vehicles about to cross on edges of the same or higher priority.
    pub fn may_cross(&self, node: NodeId, arrived_from: Option<EdgeId>) -> bool {
        let priority = self.priority(arrived_from);
        !self
            .topology
            .incoming(node)
            .iter()
            .filter(|e| Some(**e) != arrived_from)
            .filter(|e| self.topology.edge(**e).priority() >= priority)
            .any(|e| self.is_approaching(*e))
    }
}
