//! Destination choice and traffic-aware route selection.

pub use paths::RouteTable;
pub use weights::{PathFrequency, WeightMatrix};

mod paths;
mod weights;
