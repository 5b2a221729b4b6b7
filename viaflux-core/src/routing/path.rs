//! Paths produced by the router.

use petgraph::graph::EdgeIndex;

/// An ordered edge sequence with its cumulative cost.
///
/// Ephemeral: paths feed matrix construction and the simulation successor
/// table, nothing retains them beyond that.
#[derive(Debug, Clone)]
pub struct RoutePath {
    pub edges: Vec<EdgeIndex>,
    pub cost: f64,
}

/// Up to k paths per OD pair, indexed like the pair slice they were computed
/// from. Paths appear in discovery order, which is non-decreasing in cost.
#[derive(Debug, Clone, Default)]
pub struct PathSet {
    paths: Vec<Vec<RoutePath>>,
}

impl PathSet {
    pub(crate) fn new(paths: Vec<Vec<RoutePath>>) -> Self {
        PathSet { paths }
    }

    pub fn pair_count(&self) -> usize {
        self.paths.len()
    }

    /// Paths of one OD pair.
    pub fn paths(&self, pair: usize) -> &[RoutePath] {
        &self.paths[pair]
    }

    /// Per-pair path lists, in pair order.
    pub fn iter(&self) -> impl Iterator<Item = &[RoutePath]> {
        self.paths.iter().map(Vec::as_slice)
    }

    pub fn total_paths(&self) -> usize {
        self.paths.iter().map(Vec::len).sum()
    }
}
