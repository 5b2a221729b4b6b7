//! Multinomial-logit path choice and matrix construction.

use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::graph::EdgeIndex;

use crate::model::network::RoadGraph;
use crate::model::od::OdPair;
use crate::routing::PathSet;

/// Incidence and assignment matrices over the union of routed edges.
///
/// `incidence[pair][path][edge]` flags whether the path crosses the edge;
/// `assignment[pair][path][edge]` carries the path's choice probability
/// wherever the incidence is true, else 0. Pairs without paths have empty
/// rows.
#[derive(Debug, Clone)]
pub struct AssignmentTables {
    /// Deduplicated union of the edges crossed by any path, in
    /// first-appearance order.
    pub edge_index: Vec<EdgeIndex>,
    /// Choice probability per pair and path, rounded to 3 decimals.
    pub probabilities: Vec<Vec<f64>>,
    pub incidence: Vec<Vec<Vec<bool>>>,
    pub assignment: Vec<Vec<Vec<f64>>>,
}

impl AssignmentTables {
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn pair_count(&self) -> usize {
        self.assignment.len()
    }
}

/// Builds the incidence matrix and the direct proportional assignment for a
/// set of routed paths. One shot - no equilibrium iteration.
pub fn assign(graph: &RoadGraph, pairs: &[OdPair], paths: &PathSet, theta: f64) -> AssignmentTables {
    let edge_index: Vec<EdgeIndex> = paths
        .iter()
        .flat_map(|pair_paths| pair_paths.iter())
        .flat_map(|path| path.edges.iter().copied())
        .unique()
        .collect();
    let positions: HashMap<EdgeIndex, usize> = edge_index
        .iter()
        .enumerate()
        .map(|(pos, &edge)| (edge, pos))
        .collect();

    let mut probabilities = Vec::with_capacity(paths.pair_count());
    let mut incidence = Vec::with_capacity(paths.pair_count());
    let mut assignment = Vec::with_capacity(paths.pair_count());

    for (pair_idx, pair_paths) in paths.iter().enumerate() {
        let costs: Vec<f64> = pair_paths
            .iter()
            .map(|path| path_cost(graph, pairs[pair_idx].cost_type, &path.edges))
            .collect();
        let probs = logit_probabilities(&costs, theta);

        let mut pair_incidence = Vec::with_capacity(pair_paths.len());
        let mut pair_assignment = Vec::with_capacity(pair_paths.len());
        for (path, &probability) in pair_paths.iter().zip(&probs) {
            let mut row_incidence = vec![false; edge_index.len()];
            let mut row_assignment = vec![0.0; edge_index.len()];
            for edge in &path.edges {
                let pos = positions[edge];
                row_incidence[pos] = true;
                row_assignment[pos] = probability;
            }
            pair_incidence.push(row_incidence);
            pair_assignment.push(row_assignment);
        }
        probabilities.push(probs);
        incidence.push(pair_incidence);
        assignment.push(pair_assignment);
    }

    AssignmentTables {
        edge_index,
        probabilities,
        incidence,
        assignment,
    }
}

/// Total cost of a path under the pair's cost type.
fn path_cost(graph: &RoadGraph, cost_type: crate::model::network::CostType, edges: &[EdgeIndex]) -> f64 {
    edges
        .iter()
        .filter_map(|&edge| graph.edge_by_index(edge).cost(cost_type))
        .sum()
}

/// Multinomial logit over the pair's path costs, rounded to 3 decimals.
fn logit_probabilities(costs: &[f64], theta: f64) -> Vec<f64> {
    if costs.is_empty() {
        return Vec::new();
    }
    // Shift by the minimum cost so the exponentials cannot underflow to an
    // all-zero row; the shift cancels in the ratio.
    let min_cost = costs.iter().copied().fold(f64::INFINITY, f64::min);
    let scaled: Vec<f64> = costs
        .iter()
        .map(|&cost| (-(cost - min_cost) / theta).exp())
        .collect();
    let sigma: f64 = scaled.iter().sum();
    scaled.iter().map(|&value| round3(value / sigma)).collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
