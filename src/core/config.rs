// Copyright @yucwang 2026

use std::time::Duration;

use crate::core::error::{ Result, ViewFactorError };
use crate::math::constants::Float;

/// Tunables of a view-factor run.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFactorConfig {
    /// Monte Carlo rays per visibility resolution.
    pub nrays: usize,
    /// Estimates below this are inconclusive and go to ray sampling.
    pub factor_eps: Float,
    /// Patches smaller than this fraction of the mean top-level area are
    /// not refined further.
    pub area_eps: Float,
    /// Pairs with both estimates below this contribute nothing.
    pub negligible_factor: Float,
    pub seed: u64,
    pub max_depth: u32,
    /// Forced subdivisions per side before the first estimate.
    pub min_refinement: u32,
    /// Worker threads; 0 picks the available parallelism.
    pub threads: usize,
    pub time_budget: Option<Duration>,
    /// Relative trim at both ends of an occlusion segment.
    pub ray_trim: Float,
    /// Grid resolution of curved patches inside the occluder.
    pub curved_tessellation: usize,
    pub progress: bool,
}

impl Default for ViewFactorConfig {
    fn default() -> Self {
        Self {
            nrays: 32,
            factor_eps: 1e-2,
            area_eps: 1e-1,
            negligible_factor: 1e-10,
            seed: 0,
            max_depth: 64,
            min_refinement: 1,
            threads: 0,
            time_budget: None,
            ray_trim: 1e-4,
            curved_tessellation: 4,
            progress: false,
        }
    }
}

fn positive(name: &str, value: Float) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ViewFactorError::InvalidConfig(format!("{} must be positive, got {}", name, value)))
    }
}

impl ViewFactorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nrays == 0 {
            return Err(ViewFactorError::InvalidConfig("nrays must be at least 1".to_string()));
        }
        positive("factor_eps", self.factor_eps)?;
        positive("area_eps", self.area_eps)?;
        positive("negligible_factor", self.negligible_factor)?;
        if !(self.ray_trim > 0.0 && self.ray_trim < 0.5) {
            return Err(ViewFactorError::InvalidConfig(
                format!("ray_trim must lie in (0, 0.5), got {}", self.ray_trim)));
        }
        Ok(())
    }

    /// Number of workers actually spawned.
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        }
    }
}
