//! Route alternative enumeration.

mod ksp;
mod path;

pub use ksp::k_shortest_paths;
pub use path::{PathSet, RoutePath};
