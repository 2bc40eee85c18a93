use crate::NodeId;
use itertools::Itertools;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The relative demand for trips between each ordered pair of sites.
///
/// Row `i` holds the weights of the destinations of trips departing from site `i`.
/// The diagonal is always zero.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightMatrix {
    /// The sites, in row/column order.
    sites: Vec<NodeId>,
    /// Row-major weights.
    weights: Vec<f64>,
}

/// The expected number of vehicles per second travelling between two sites, in either direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathFrequency {
    pub sites: (NodeId, NodeId),
    /// Vehicles per second.
    pub frequency: f64,
}

impl WeightMatrix {
    /// Creates a matrix with every weight set to zero.
    pub fn zeros(sites: Vec<NodeId>) -> Self {
        let n = sites.len();
        Self {
            sites,
            weights: vec![0.0; n * n],
        }
    }

    /// Creates a matrix where every trip between distinct sites is equally likely.
    pub fn uniform(sites: Vec<NodeId>) -> Self {
        let mut matrix = Self::zeros(sites);
        let n = matrix.sites.len();
        for (i, j) in (0..n).cartesian_product(0..n).filter(|(i, j)| i != j) {
            matrix.weights[i * n + j] = 1.0;
        }
        matrix
    }

    /// Creates a matrix from rows of weights. Diagonal entries are ignored.
    ///
    /// # Panics
    /// If the rows do not form a square matrix matching `sites`,
    /// or if any weight is negative or not finite.
    pub fn from_rows(sites: Vec<NodeId>, rows: &[Vec<f64>]) -> Self {
        let n = sites.len();
        assert!(
            rows.len() == n && rows.iter().all(|r| r.len() == n),
            "Weight matrix must be {0}x{0}",
            n
        );
        let mut matrix = Self::zeros(sites);
        for (i, row) in rows.iter().enumerate() {
            for (j, weight) in row.iter().enumerate().filter(|(j, _)| i != *j) {
                matrix.set(i, j, *weight);
            }
        }
        matrix
    }

    /// The sites, in row/column order.
    pub fn sites(&self) -> &[NodeId] {
        &self.sites
    }

    /// The number of sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// The row/column index of a site.
    pub fn index_of(&self, site: NodeId) -> Option<usize> {
        self.sites.iter().position(|s| *s == site)
    }

    /// The weight of trips from `from` to `to`, zero if either is not a site of this matrix.
    pub fn weight(&self, from: NodeId, to: NodeId) -> f64 {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.weights[i * self.len() + j],
            _ => 0.0,
        }
    }

    /// Sets the weight of trips from `from` to `to`.
    ///
    /// # Panics
    /// If either node is not a site of this matrix, or the weight is invalid.
    pub fn set_weight(&mut self, from: NodeId, to: NodeId, weight: f64) {
        let i = self.index_of(from).expect("Node is not a site");
        let j = self.index_of(to).expect("Node is not a site");
        if i != j {
            self.set(i, j, weight);
        }
    }

    /// The weights of trips departing from the site at `index`.
    pub fn row(&self, index: usize) -> &[f64] {
        let n = self.len();
        &self.weights[index * n..(index + 1) * n]
    }

    /// Returns a matrix over a new set of sites.
    /// Weights between sites present in both are kept; every other weight is zero.
    pub fn with_sites(&self, sites: Vec<NodeId>) -> Self {
        let mut matrix = Self::zeros(sites);
        let n = matrix.len();
        for (i, j) in (0..n).cartesian_product(0..n) {
            matrix.weights[i * n + j] = self.weight(matrix.sites[i], matrix.sites[j]);
        }
        matrix
    }

    /// Picks the destination of a trip departing from `from`, proportionally to the row weights.
    /// Returns `None` if no trips depart from `from`.
    pub fn sample_destination(&self, from: NodeId, rng: &mut impl Rng) -> Option<NodeId> {
        let row = self.row(self.index_of(from)?);
        let distr = WeightedIndex::<f64>::new(row).ok()?;
        Some(self.sites[distr.sample(rng)])
    }

    /// The expected vehicles per second between each unordered pair of sites,
    /// if each site generates `frequency` vehicles per second.
    pub fn path_frequencies(&self, frequency: f64) -> Vec<PathFrequency> {
        let n = self.len();
        let probs = (0..n)
            .map(|i| {
                let row = self.row(i);
                let total = row.iter().sum::<f64>();
                row.iter()
                    .map(|w| if total > 0.0 { w / total } else { 0.0 })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        (0..n)
            .tuple_combinations()
            .map(|(i, j)| PathFrequency {
                sites: (self.sites[i], self.sites[j]),
                frequency: frequency * (probs[i][j] + probs[j][i]),
            })
            .collect()
    }

    fn set(&mut self, i: usize, j: usize, weight: f64) {
        assert!(
            weight.is_finite() && weight >= 0.0,
            "Weight must be a non-negative number, got {}",
            weight
        );
        let n = self.len();
        self.weights[i * n + j] = weight;
    }
}
