use crate::math::{Point2d, Vector2d};
use crate::node::Node;
use crate::util::Interval;
use crate::{EdgeId, NodeId};
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The time a driver needs to react, in s.
pub const REACTION_TIME: f64 = 1.0; // s

/// The length of every vehicle, in m.
pub const VEHICLE_LENGTH: f64 = 5.0; // m

/// An edge represents a one-way road between two nodes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// The edge ID.
    id: EdgeId,
    /// The node the edge starts from.
    begin: NodeId,
    /// The node the edge leads to.
    end: NodeId,
    /// The location of the begin node.
    begin_loc: Point2d,
    /// The location of the end node.
    end_loc: Point2d,
    /// The length in m.
    length: f64,
    /// Unit vector from begin to end.
    direction: Vector2d,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// Right-of-way priority; higher wins.
    priority: i32,
    /// The slowest traversal observed since the last reset, in s.
    transit_time: f64,
}

/// The attributes of an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeAttributes {
    /// The requested speed limit in m/s.
    /// It is lowered if the edge is too short to keep a safe distance at this speed.
    pub speed_limit: f64,
    /// Right-of-way priority at the end node.
    pub priority: i32,
}

impl EdgeAttributes {
    pub fn new(speed_limit: f64, priority: i32) -> Self {
        Self {
            speed_limit,
            priority,
        }
    }
}

impl Edge {
    /// Creates a new edge.
    ///
    /// # Panics
    /// If `begin` and `end` are the same node, if the edge is not longer than a vehicle,
    /// or if the speed limit is not a positive number.
    pub(crate) fn new(id: EdgeId, begin: &Node, end: &Node, attribs: &EdgeAttributes) -> Self {
        assert!(begin.id() != end.id(), "Edge must join two distinct nodes");
        assert!(
            attribs.speed_limit.is_finite() && attribs.speed_limit > 0.0,
            "Speed limit must be positive, got {}",
            attribs.speed_limit
        );
        let vector = end.location() - begin.location();
        let length = vector.magnitude();
        assert!(
            length > VEHICLE_LENGTH,
            "Edge of length {} m is not longer than a vehicle",
            length
        );
        let speed_limit = f64::min(attribs.speed_limit, max_safe_speed(length));
        Self {
            id,
            begin: begin.id(),
            end: end.id(),
            begin_loc: begin.location(),
            end_loc: end.location(),
            length,
            direction: vector / length,
            speed_limit,
            priority: attribs.priority,
            transit_time: length / speed_limit,
        }
    }

    /// Creates a copy of this edge between updated nodes, e.g. after they have been moved.
    /// The measured transit time is kept.
    pub(crate) fn rebuild(&self, begin: &Node, end: &Node) -> Self {
        let mut edge = Self::new(self.id, begin, end, &self.attributes());
        edge.transit_time = f64::max(self.transit_time, edge.transit_time);
        edge
    }

    /// Gets the edge's ID.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The node the edge starts from.
    pub fn begin(&self) -> NodeId {
        self.begin
    }

    /// The node the edge leads to.
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Gets the length of the edge in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The vector from the begin node to the end node.
    pub fn vector(&self) -> Vector2d {
        self.end_loc - self.begin_loc
    }

    /// A unit vector pointing along the edge.
    pub fn direction(&self) -> Vector2d {
        self.direction
    }

    /// The effective speed limit in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The attributes that would recreate this edge.
    pub fn attributes(&self) -> EdgeAttributes {
        EdgeAttributes {
            speed_limit: self.speed_limit,
            priority: self.priority,
        }
    }

    /// The minimum front-to-front gap in m a vehicle keeps at this edge's speed limit.
    pub fn safety_distance(&self) -> f64 {
        REACTION_TIME * self.speed_limit + VEHICLE_LENGTH
    }

    /// Lowers `candidate` so that the safety distance fits in the edge.
    pub fn optimized_speed_limit(&self, candidate: f64) -> f64 {
        f64::min(candidate, max_safe_speed(self.length))
    }

    /// The scalar projection of `point - begin` onto the edge direction.
    pub fn ka(&self, point: Point2d) -> f64 {
        (point - self.begin_loc).dot(self.direction)
    }

    /// The point on the edge closest to `point`.
    pub fn closer_from(&self, point: Point2d) -> Point2d {
        let along = Interval::new(0.0, self.length).clamp(self.ka(point));
        self.location_at(along)
    }

    /// The distance in m from `point` to the closest point on the edge.
    pub fn distance_from(&self, point: Point2d) -> f64 {
        self.closer_from(point).distance(point)
    }

    /// The world space location `distance` m along the edge.
    pub fn location_at(&self, distance: f64) -> Point2d {
        self.begin_loc + self.direction * distance
    }

    /// The time in s to travel the edge at the speed limit.
    pub fn free_flow_time(&self) -> f64 {
        self.length / self.speed_limit
    }

    /// The slowest traversal time observed since the last reset, in s.
    pub fn transit_time(&self) -> f64 {
        self.transit_time
    }

    /// Records a vehicle crossing the edge in `time` seconds.
    /// Only crossings slower than the stored value change it.
    pub(crate) fn record_transit(&mut self, time: f64) {
        if time > self.transit_time {
            self.transit_time = time;
        }
    }

    /// Forgets all recorded crossings.
    pub(crate) fn reset_transit_time(&mut self) {
        self.transit_time = self.free_flow_time();
    }
}

/// The highest speed in m/s whose safety distance does not exceed `length`.
pub fn max_safe_speed(length: f64) -> f64 {
    (length - VEHICLE_LENGTH) / REACTION_TIME
}
