use crate::edge::Edge;
use crate::{EdgeId, NodeId, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distances closer than this to the end of an edge count as having reached it, in m.
const END_TOLERANCE: f64 = 1e-9; // m

/// A simulated vehicle.
///
/// A vehicle travels from its departure site to its destination site,
/// then turns back and travels home, after which it leaves the simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The site the vehicle started from.
    departure: NodeId,
    /// The site the vehicle is heading to.
    destination: NodeId,
    /// The simulation time the vehicle was created at, in s.
    creation_time: f64,
    /// Where the vehicle currently is.
    state: VehicleState,
    /// Whether the vehicle has reached its destination and is heading home.
    returning: bool,
}

/// The position of a vehicle in the network.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VehicleState {
    /// Stopped at a node, waiting to enter its next edge.
    Waiting {
        /// The node the vehicle is at.
        node: NodeId,
        /// The edge the vehicle arrived on, if it did not start here.
        arrived_from: Option<EdgeId>,
    },
    /// Travelling along an edge.
    Transiting {
        edge: EdgeId,
        /// Distance from the start of the edge in m.
        distance: f64,
        /// The simulation time the vehicle entered the edge at, in s.
        entry_time: f64,
    },
}

/// What happened when a vehicle reached the node it was heading to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrival {
    /// The vehicle reached its destination and now heads back to its departure.
    TurnedBack,
    /// The vehicle is back home and leaves the simulation.
    Completed,
}

/// The attributes of a vehicle placed into a new simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleAttributes {
    pub departure: NodeId,
    pub destination: NodeId,
    /// The creation time in s.
    pub creation_time: f64,
    pub returning: bool,
    /// The edge and distance along it, or `None` to wait at the node the vehicle is leaving from.
    pub location: Option<(EdgeId, f64)>,
}

impl Vehicle {
    /// Creates a new vehicle waiting at its departure site.
    pub(crate) fn new(id: VehicleId, departure: NodeId, destination: NodeId, time: f64) -> Self {
        Self {
            id,
            departure,
            destination,
            creation_time: time,
            state: VehicleState::Waiting {
                node: departure,
                arrived_from: None,
            },
            returning: false,
        }
    }

    /// Creates a vehicle from its attributes.
    /// A vehicle placed on an edge is treated as having entered it at `time`.
    pub(crate) fn from_attributes(id: VehicleId, attribs: &VehicleAttributes, time: f64) -> Self {
        let mut vehicle = Self::new(id, attribs.departure, attribs.destination, attribs.creation_time);
        vehicle.returning = attribs.returning;
        vehicle.state = match attribs.location {
            Some((edge, distance)) => VehicleState::Transiting {
                edge,
                distance,
                entry_time: time,
            },
            None => VehicleState::Waiting {
                node: vehicle.origin(),
                arrived_from: None,
            },
        };
        vehicle
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn departure(&self) -> NodeId {
        self.departure
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// The simulation time the vehicle was created at, in s.
    pub fn creation_time(&self) -> f64 {
        self.creation_time
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Whether the vehicle is heading back to its departure site.
    pub fn is_returning(&self) -> bool {
        self.returning
    }

    /// The site the vehicle is currently heading to.
    pub fn current_destination(&self) -> NodeId {
        if self.returning {
            self.departure
        } else {
            self.destination
        }
    }

    /// The site the vehicle set off from on its current leg.
    fn origin(&self) -> NodeId {
        if self.returning {
            self.destination
        } else {
            self.departure
        }
    }

    /// The ID of the edge the vehicle is travelling on.
    pub fn edge_id(&self) -> Option<EdgeId> {
        match self.state {
            VehicleState::Transiting { edge, .. } => Some(edge),
            VehicleState::Waiting { .. } => None,
        }
    }

    /// The distance in m along the current edge.
    pub fn distance(&self) -> Option<f64> {
        match self.state {
            VehicleState::Transiting { distance, .. } => Some(distance),
            VehicleState::Waiting { .. } => None,
        }
    }

    /// The node the vehicle is waiting at.
    pub fn waiting_node(&self) -> Option<NodeId> {
        match self.state {
            VehicleState::Waiting { node, .. } => Some(node),
            VehicleState::Transiting { .. } => None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, VehicleState::Waiting { .. })
    }

    /// Whether the vehicle is waiting to cross the given node.
    pub fn is_crossing_node(&self, node: NodeId) -> bool {
        self.waiting_node() == Some(node)
    }

    /// Moves a waiting vehicle onto the start of an edge.
    ///
    /// # Panics
    /// If the vehicle is not waiting.
    pub(crate) fn enter_edge(&mut self, edge: EdgeId, time: f64) {
        assert!(self.is_waiting(), "Vehicle {:?} is already on an edge", self.id);
        self.state = VehicleState::Transiting {
            edge,
            distance: 0.0,
            entry_time: time,
        };
    }

    /// Moves the vehicle `ds` m along its edge.
    /// If this reaches the end of the edge, the vehicle starts waiting at the edge's end node
    /// and the time it spent on the edge is returned.
    ///
    /// # Parameters
    /// * `ds` - The distance to move in m
    /// * `edge` - The edge the vehicle is on
    /// * `time` - The current simulation time in s
    pub(crate) fn advance(&mut self, ds: f64, edge: &Edge, time: f64) -> Option<f64> {
        let (distance, entry_time) = match &mut self.state {
            VehicleState::Transiting {
                distance,
                entry_time,
                ..
            } => {
                *distance = f64::min(*distance + ds, edge.length());
                (*distance, *entry_time)
            }
            VehicleState::Waiting { .. } => return None,
        };
        if edge.length() - distance > END_TOLERANCE {
            return None;
        }
        self.state = VehicleState::Waiting {
            node: edge.end(),
            arrived_from: Some(edge.id()),
        };
        Some(time - entry_time)
    }

    /// Handles the vehicle reaching its current destination.
    pub(crate) fn reach_destination(&mut self) -> Arrival {
        if self.returning {
            Arrival::Completed
        } else {
            self.returning = true;
            Arrival::TurnedBack
        }
    }

    /// Makes a vehicle that arrived along `from` count as having arrived along `to`.
    pub(crate) fn replace_arrival_edge(&mut self, from: EdgeId, to: EdgeId) {
        if let VehicleState::Waiting { arrived_from, .. } = &mut self.state {
            if *arrived_from == Some(from) {
                *arrived_from = Some(to);
            }
        }
    }

    /// Puts the vehicle on an edge at the given distance, keeping its entry time if it has one.
    pub(crate) fn set_location(&mut self, edge: EdgeId, distance: f64, time: f64) {
        let entry_time = match self.state {
            VehicleState::Transiting { entry_time, .. } => entry_time,
            VehicleState::Waiting { .. } => time,
        };
        self.state = VehicleState::Transiting {
            edge,
            distance,
            entry_time,
        };
    }
}
