use crate::edge::{Edge, EdgeAttributes};
use crate::math::{Point2d, Rect, Vector2d};
use crate::node::{Node, NodeKind};
use crate::{EdgeId, NodeId};
use cgmath::prelude::*;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;

type EdgeList = SmallVec<[EdgeId; 4]>;

/// The road graph: nodes and the one-way edges between them.
///
/// Nodes and edges are stored in arenas and refer to each other by ID only.
/// Cloning a topology keeps every ID valid in the clone.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Topology {
    /// The nodes in the network.
    nodes: SlotMap<NodeId, Node>,
    /// The edges in the network.
    edges: SlotMap<EdgeId, Edge>,
    /// The edges ending at each node.
    incoming: SecondaryMap<NodeId, EdgeList>,
    /// The edges starting at each node.
    outgoing: SecondaryMap<NodeId, EdgeList>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a node to the network.
    pub fn add_node(&mut self, location: Point2d, kind: NodeKind) -> NodeId {
        let id = self
            .nodes
            .insert_with_key(|id| Node::new(id, location, kind));
        self.incoming.insert(id, EdgeList::new());
        self.outgoing.insert(id, EdgeList::new());
        id
    }

    /// Adds an edge from `begin` to `end`.
    ///
    /// # Panics
    /// If either node is not in the network, or the edge is invalid (see [Edge]).
    pub fn add_edge(&mut self, begin: NodeId, end: NodeId, attribs: &EdgeAttributes) -> EdgeId {
        let (begin_node, end_node) = (&self.nodes[begin], &self.nodes[end]);
        let id = self
            .edges
            .insert_with_key(|id| Edge::new(id, begin_node, end_node, attribs));
        self.outgoing[begin].push(id);
        self.incoming[end].push(id);
        id
    }

    /// Removes an edge from the network and returns it.
    ///
    /// # Panics
    /// If the edge is not in the network.
    pub fn remove_edge(&mut self, id: EdgeId) -> Edge {
        let edge = self.edges.remove(id).expect("Edge is not in the topology");
        self.outgoing[edge.begin()].retain(|e| *e != id);
        self.incoming[edge.end()].retain(|e| *e != id);
        edge
    }

    /// Removes a node and every edge touching it.
    /// Returns the IDs of the removed edges.
    ///
    /// # Panics
    /// If the node is not in the network.
    pub fn remove_node(&mut self, id: NodeId) -> Vec<EdgeId> {
        assert!(self.nodes.contains_key(id), "Node is not in the topology");
        let removed = self.incident_edges(id).collect::<Vec<_>>();
        for edge_id in &removed {
            self.remove_edge(*edge_id);
        }
        self.nodes.remove(id);
        self.incoming.remove(id);
        self.outgoing.remove(id);
        debug!("removed node {:?} and {} edges", id, removed.len());
        removed
    }

    /// Changes whether a node is a site or a crossing.
    pub fn set_node_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id].set_kind(kind);
    }

    /// Rebuilds an edge with new attributes, keeping its ID and end points.
    pub fn set_edge_attributes(&mut self, id: EdgeId, attribs: &EdgeAttributes) {
        let edge = &self.edges[id];
        let rebuilt = Edge::new(id, &self.nodes[edge.begin()], &self.nodes[edge.end()], attribs);
        self.edges[id] = rebuilt;
    }

    /// Moves every node by `offset`.
    pub fn translate(&mut self, offset: Vector2d) {
        for node in self.nodes.values_mut() {
            node.translate(offset);
        }
        for edge in self.edges.values_mut() {
            *edge = edge.rebuild(&self.nodes[edge.begin()], &self.nodes[edge.end()]);
        }
    }

    /// Gets a reference to the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Gets a reference to the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id]
    }

    /// Returns an iterator over all the nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns an iterator over all the edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Returns an iterator over the IDs of the site nodes.
    pub fn sites(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|n| n.is_site()).map(|n| n.id())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    /// The edges ending at a node.
    pub fn incoming(&self, id: NodeId) -> &[EdgeId] {
        &self.incoming[id]
    }

    /// The edges starting at a node.
    pub fn outgoing(&self, id: NodeId) -> &[EdgeId] {
        &self.outgoing[id]
    }

    /// The edges starting or ending at a node.
    pub fn incident_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.incoming[id]
            .iter()
            .chain(self.outgoing[id].iter())
            .copied()
    }

    /// Finds an edge from `begin` to `end`, if there is one.
    pub fn find_edge(&self, begin: NodeId, end: NodeId) -> Option<EdgeId> {
        self.outgoing
            .get(begin)?
            .iter()
            .copied()
            .find(|id| self.edges[*id].end() == end)
    }

    /// Finds the node closest to `point` that is no further than `radius` away.
    pub fn find_node_near(&self, point: Point2d, radius: f64) -> Option<NodeId> {
        self.nodes
            .values()
            .map(|n| (n.id(), n.location().distance(point)))
            .filter(|(_, dist)| *dist <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Finds the edge closest to `point` that is no further than `radius` away.
    pub fn find_edge_near(&self, point: Point2d, radius: f64) -> Option<EdgeId> {
        self.edges
            .values()
            .map(|e| (e.id(), e.distance_from(point)))
            .filter(|(_, dist)| *dist <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// The smallest rectangle containing every node, if there are any.
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(self.nodes.values().map(|n| n.location()))
    }

    /// Resets the measured transit time of every edge.
    pub(crate) fn reset_transit_times(&mut self) {
        for edge in self.edges.values_mut() {
            edge.reset_transit_time();
        }
    }
}
