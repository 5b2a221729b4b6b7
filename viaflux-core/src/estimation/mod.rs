//! Generalized-least-squares demand estimation from observed link flows.

use log::debug;

use crate::assignment::AssignmentTables;

/// Observed flow on one edge of the assignment edge index.
#[derive(Debug, Clone, Copy)]
pub struct LinkFlow {
    /// Observed vehicle count
    pub value: f64,
    /// Measurement variance
    pub variance: f64,
}

impl LinkFlow {
    pub fn new(value: f64, variance: f64) -> Self {
        LinkFlow { value, variance }
    }
}

/// Estimates the integer demand of every OD pair from observed link flows.
///
/// `flows` is indexed like [`AssignmentTables::edge_index`]. Pairs without
/// any computed path yield `None` - demand for them is unavailable, not an
/// error.
pub fn estimate_demand(
    tables: &AssignmentTables,
    flows: &[LinkFlow],
    max_demand: u32,
) -> Vec<Option<u32>> {
    debug_assert_eq!(flows.len(), tables.edge_count());
    tables
        .assignment
        .iter()
        .enumerate()
        .map(|(pair_idx, rows)| {
            if rows.is_empty() {
                debug!("pair {pair_idx} has no paths, demand unavailable");
                return None;
            }
            Some(pair_demand(rows, flows, max_demand))
        })
        .collect()
}

/// Monotonic probe: walk the demand upward while the weighted squared error
/// strictly decreases. This is the arg-min of the probe under a unimodal
/// error curve, not a global optimizer.
fn pair_demand(rows: &[Vec<f64>], flows: &[LinkFlow], max_demand: u32) -> u32 {
    let mut previous = error_at(rows, flows, 0);
    if previous == 0.0 {
        return 0;
    }
    let mut best = 0;
    for x in 1..=max_demand {
        let error = error_at(rows, flows, x);
        if error < previous {
            best = x;
            previous = error;
        } else {
            break;
        }
    }
    best
}

/// Variance-weighted squared deviation between observed and predicted flows
/// for demand `x`, over the edges with positive observed flow crossed by at
/// least one of the pair's paths.
fn error_at(rows: &[Vec<f64>], flows: &[LinkFlow], x: u32) -> f64 {
    let mut error = 0.0;
    for (pos, flow) in flows.iter().enumerate() {
        if flow.value <= 0.0 {
            continue;
        }
        if !rows.iter().any(|row| row[pos] > 0.0) {
            continue;
        }
        let predicted = round2(
            rows.iter()
                .map(|row| row[pos] * f64::from(x))
                .sum::<f64>(),
        );
        let residual = flow.value - predicted;
        error = round2(error + residual * residual / flow.variance);
    }
    error
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
