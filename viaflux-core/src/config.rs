//! Configuration surface of the engine. All pure values, no runtime behavior.

/// Tuning values consumed by the router, the assigner, the demand estimator
/// and the loading simulation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Logit dispersion parameter θ. Larger values spread choice
    /// probabilities more evenly across route alternatives.
    pub theta: f64,
    /// Maximum number of alternative paths computed per OD pair.
    pub k_paths: usize,
    /// Upper bound of the demand estimator probe, in vehicles.
    pub max_demand: u32,
    /// Cap on the simulation time step, in seconds.
    pub max_step: f64,
    /// Fraction of edge storage above which traffic counts as moderate.
    pub moderate_threshold: f64,
    /// Fraction of edge storage above which traffic counts as heavy.
    pub heavy_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            theta: 60.0,
            k_paths: 3,
            max_demand: 500,
            max_step: 30.0,
            moderate_threshold: 0.5,
            heavy_threshold: 0.8,
        }
    }
}
