use crate::edge::{EdgeAttributes, VEHICLE_LENGTH};
use crate::math::{from_polar, Point2d};
use cgmath::prelude::*;
use cgmath::Rad;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A prefabricated piece of road network that can be placed into a simulation.
///
/// Node locations are relative to the module's anchor, with the positive x-axis
/// pointing in the module's direction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapModule {
    nodes: Vec<Point2d>,
    edges: Vec<ModuleEdge>,
}

/// An edge of a [MapModule], referring to its nodes by index.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleEdge {
    pub begin: usize,
    pub end: usize,
    pub attributes: EdgeAttributes,
}

impl MapModule {
    /// Creates a module.
    ///
    /// # Panics
    /// If an edge refers to a node index out of range, or joins a node to itself.
    pub fn new(nodes: Vec<Point2d>, edges: Vec<ModuleEdge>) -> Self {
        for edge in &edges {
            assert!(
                edge.begin < nodes.len() && edge.end < nodes.len(),
                "Module edge refers to a missing node"
            );
            assert!(edge.begin != edge.end, "Module edge must join two distinct nodes");
        }
        Self { nodes, edges }
    }

    /// The node locations, relative to the anchor.
    pub fn nodes(&self) -> &[Point2d] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ModuleEdge] {
        &self.edges
    }

    /// A four-way junction with two-way arms of length `arm`.
    /// Traffic along the x-axis has right of way over traffic along the y-axis.
    pub fn cross(arm: f64, speed_limit: f64) -> Self {
        assert!(arm > VEHICLE_LENGTH, "Arms must be longer than a vehicle");
        let nodes = vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(arm, 0.0),
            Point2d::new(0.0, arm),
            Point2d::new(-arm, 0.0),
            Point2d::new(0.0, -arm),
        ];
        let edges = (1..5)
            .flat_map(|i| {
                let major = i % 2 == 1;
                [
                    ModuleEdge {
                        begin: i,
                        end: 0,
                        attributes: EdgeAttributes::new(speed_limit, if major { 1 } else { 0 }),
                    },
                    ModuleEdge {
                        begin: 0,
                        end: i,
                        attributes: EdgeAttributes::new(speed_limit, 0),
                    },
                ]
            })
            .collect();
        Self::new(nodes, edges)
    }

    /// A one-way anticlockwise ring of `arms` nodes with a two-way arm leaving each of them.
    /// The arms are `radius` long and traffic on the ring has right of way.
    pub fn roundabout(radius: f64, arms: usize, speed_limit: f64) -> Self {
        assert!(arms >= 3, "A roundabout needs at least 3 arms");
        let step = TAU / arms as f64;
        let chord = 2.0 * radius * (step / 2.0).sin();
        assert!(
            chord > VEHICLE_LENGTH && radius > VEHICLE_LENGTH,
            "Roundabout is too small for its number of arms"
        );

        let origin = Point2d::origin();
        let ring = (0..arms).map(|i| origin + from_polar(radius, Rad(step * i as f64)));
        let outer = (0..arms).map(|i| origin + from_polar(2.0 * radius, Rad(step * i as f64)));
        let nodes = ring.chain(outer).collect::<Vec<_>>();

        let mut edges = Vec::with_capacity(3 * arms);
        for i in 0..arms {
            edges.push(ModuleEdge {
                begin: i,
                end: (i + 1) % arms,
                attributes: EdgeAttributes::new(speed_limit, 1),
            });
            edges.push(ModuleEdge {
                begin: arms + i,
                end: i,
                attributes: EdgeAttributes::new(speed_limit, 0),
            });
            edges.push(ModuleEdge {
                begin: i,
                end: arms + i,
                attributes: EdgeAttributes::new(speed_limit, 0),
            });
        }
        Self::new(nodes, edges)
    }
}
