use crate::math::{Point2d, Vector2d};
use crate::NodeId;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The role a node plays in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// A traffic source and sink, and a routing endpoint.
    Site,
    /// A pass-through junction.
    Crossing,
}

impl NodeKind {
    /// The other kind.
    pub fn toggled(self) -> Self {
        match self {
            NodeKind::Site => NodeKind::Crossing,
            NodeKind::Crossing => NodeKind::Site,
        }
    }
}

/// A point in the road network where edges begin and end.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// The node ID.
    pub(crate) id: NodeId,
    /// The world space location in m.
    location: Point2d,
    /// Whether the node is a site or a crossing.
    kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, location: Point2d, kind: NodeKind) -> Self {
        Self { id, location, kind }
    }

    /// Gets the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Gets the node's location in world space.
    pub fn location(&self) -> Point2d {
        self.location
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether the node is a site.
    pub fn is_site(&self) -> bool {
        self.kind == NodeKind::Site
    }

    pub(crate) fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub(crate) fn translate(&mut self, offset: Vector2d) {
        self.location += offset;
    }
}
