use crate::topology::Topology;
use crate::{EdgeId, NodeId};
use log::debug;
use pathfinding::matrix::Matrix;
use std::collections::HashMap;

/// The first edge to take from any node towards any other node,
/// along the path with the shortest total transit time.
///
/// Pairs with no path between them are absent.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    /// The first edge of the shortest path for each `(origin, destination)` pair.
    routes: HashMap<(NodeId, NodeId), EdgeId>,
    /// Whether the table reflects the current topology.
    valid: bool,
}

impl RouteTable {
    /// Computes the routes of a topology, weighting each edge by its measured transit time.
    pub fn compute(topology: &Topology) -> Self {
        let nodes = topology.nodes().map(|n| n.id()).collect::<Vec<_>>();
        let edges = topology
            .edges()
            .map(|e| (e.id(), e.begin(), e.end(), e.transit_time()));
        let table = Self::from_weights(&nodes, edges);
        debug!(
            "computed {} routes over {} nodes",
            table.routes.len(),
            nodes.len()
        );
        table
    }

    /// Computes the routes between `nodes` given `(edge, begin, end, weight)` tuples.
    ///
    /// All-pairs shortest paths are found with the Floyd-Warshall algorithm,
    /// keeping the predecessor of each node on each path. The predecessors
    /// are then walked back from each destination to find the first edge.
    pub(crate) fn from_weights(
        nodes: &[NodeId],
        edges: impl IntoIterator<Item = (EdgeId, NodeId, NodeId, f64)>,
    ) -> Self {
        let n = nodes.len();
        if n == 0 {
            return Self {
                routes: HashMap::new(),
                valid: true,
            };
        }
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect::<HashMap<_, _>>();

        let mut dist = Matrix::new(n, n, f64::INFINITY);
        let mut pred: Matrix<Option<usize>> = Matrix::new(n, n, None);
        let mut direct: Matrix<Option<EdgeId>> = Matrix::new(n, n, None);

        for i in 0..n {
            dist[(i, i)] = 0.0;
        }
        for (edge, begin, end, weight) in edges {
            let (i, j) = (index[&begin], index[&end]);
            if weight < dist[(i, j)] {
                dist[(i, j)] = weight;
                pred[(i, j)] = Some(i);
                direct[(i, j)] = Some(edge);
            }
        }

        for k in 0..n {
            for i in 0..n {
                if dist[(i, k)] == f64::INFINITY {
                    continue;
                }
                for j in 0..n {
                    let through = dist[(i, k)] + dist[(k, j)];
                    if through < dist[(i, j)] {
                        dist[(i, j)] = through;
                        pred[(i, j)] = pred[(k, j)];
                    }
                }
            }
        }

        let mut routes = HashMap::new();
        for i in 0..n {
            for j in (0..n).filter(|j| *j != i) {
                // Walk back from the destination until the node after the origin
                let mut hop = j;
                while let Some(p) = pred[(i, hop)] {
                    if p == i {
                        break;
                    }
                    hop = p;
                }
                if pred[(i, hop)] == Some(i) {
                    if let Some(edge) = direct[(i, hop)] {
                        routes.insert((nodes[i], nodes[j]), edge);
                    }
                }
            }
        }

        Self {
            routes,
            valid: true,
        }
    }

    /// The first edge to take from `from` to reach `to`, if there is a path.
    pub fn next_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.routes.get(&(from, to)).copied()
    }

    /// The number of `(origin, destination)` pairs with a route.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether the table is up to date with the topology it was computed from.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the table as needing recomputation.
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::EdgeAttributes;
    use crate::math::Point2d;
    use crate::node::NodeKind;
    use itertools::iproduct;
    use pathfinding::directed::dijkstra::dijkstra;
    use slotmap::SlotMap;

    fn ids(count: usize) -> (Vec<NodeId>, Vec<EdgeId>) {
        let mut nodes = SlotMap::<NodeId, ()>::with_key();
        let mut edges = SlotMap::<EdgeId, ()>::with_key();
        (
            (0..count).map(|_| nodes.insert(())).collect(),
            (0..count + 1).map(|_| edges.insert(())).collect(),
        )
    }

    /// A 3-node cycle with a shortcut from node 0 to node 2.
    fn cycle(n: &[NodeId], e: &[EdgeId], times: [f64; 4]) -> RouteTable {
        RouteTable::from_weights(
            n,
            [
                (e[0], n[0], n[1], times[0]),
                (e[1], n[1], n[2], times[1]),
                (e[2], n[2], n[0], times[2]),
                (e[3], n[0], n[2], times[3]),
            ],
        )
    }

    #[test]
    fn three_node_cycle() {
        let (n, e) = ids(3);
        let table = cycle(&n, &e, [2.0, 6.0, 3.0, 4.0]);

        assert_eq!(table.next_edge(n[0], n[1]), Some(e[0]));
        assert_eq!(table.next_edge(n[0], n[2]), Some(e[3]));
        assert_eq!(table.next_edge(n[1], n[2]), Some(e[1]));
        assert_eq!(table.next_edge(n[1], n[0]), Some(e[1]));
        assert_eq!(table.next_edge(n[2], n[0]), Some(e[2]));
        assert_eq!(table.next_edge(n[2], n[1]), Some(e[2]));
        assert_eq!(table.next_edge(n[0], n[0]), None);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn slow_edge_is_avoided() {
        let (n, e) = ids(3);
        // The shortcut becomes congested, so the way round is quicker
        let table = cycle(&n, &e, [2.0, 1.0, 3.0, 4.0]);
        assert_eq!(table.next_edge(n[0], n[2]), Some(e[0]));
        assert_eq!(table.next_edge(n[1], n[0]), Some(e[1]));
    }

    #[test]
    fn disconnected_pairs_are_absent() {
        let (n, e) = ids(4);
        let table = RouteTable::from_weights(
            &n,
            [(e[0], n[0], n[1], 1.0), (e[1], n[2], n[3], 1.0)],
        );
        assert_eq!(table.next_edge(n[0], n[1]), Some(e[0]));
        assert_eq!(table.next_edge(n[1], n[0]), None);
        assert_eq!(table.next_edge(n[0], n[3]), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn parallel_edges_pick_the_quickest() {
        let (n, e) = ids(2);
        let table = RouteTable::from_weights(
            &n,
            [(e[0], n[0], n[1], 5.0), (e[1], n[0], n[1], 3.0)],
        );
        assert_eq!(table.next_edge(n[0], n[1]), Some(e[1]));
    }

    #[test]
    fn matches_dijkstra_on_a_grid() {
        // A 4x4 two-way grid with irregular speed limits
        let mut topo = Topology::new();
        let grid = iproduct!(0..4, 0..4)
            .map(|(x, y)| {
                let loc = Point2d::new(100.0 * x as f64, 100.0 * y as f64);
                topo.add_node(loc, NodeKind::Crossing)
            })
            .collect::<Vec<_>>();
        for (x, y) in iproduct!(0..4usize, 0..4usize) {
            let here = grid[4 * x + y];
            let speed = 5.0 + ((3 * x + 5 * y) % 7) as f64 * 2.5;
            if x < 3 {
                let there = grid[4 * (x + 1) + y];
                topo.add_edge(here, there, &EdgeAttributes::new(speed, 0));
                topo.add_edge(there, here, &EdgeAttributes::new(speed + 5.0, 0));
            }
            if y < 3 {
                let there = grid[4 * x + y + 1];
                topo.add_edge(here, there, &EdgeAttributes::new(speed + 2.5, 0));
                topo.add_edge(there, here, &EdgeAttributes::new(speed, 0));
            }
        }
        let table = RouteTable::compute(&topo);

        // Millisecond costs so Dijkstra can use integers
        let cost = |id: EdgeId| (topo.edge(id).transit_time() * 1000.0).round() as u64;
        for (from, to) in iproduct!(grid.iter().copied(), grid.iter().copied()) {
            if from == to {
                continue;
            }
            let (_, expected) = dijkstra(
                &from,
                |node| topo.outgoing(*node).iter().map(|e| (topo.edge(*e).end(), cost(*e))).collect::<Vec<_>>(),
                |node| *node == to,
            )
            .unwrap();

            let mut node = from;
            let mut total = 0;
            while node != to {
                let edge = table.next_edge(node, to).unwrap();
                total += cost(edge);
                node = topo.edge(edge).end();
            }
            // Rounding each edge can shift the total by a few ms
            assert!(total.abs_diff(expected) <= 16, "{} vs {}", total, expected);
        }
    }
}
