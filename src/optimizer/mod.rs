pub mod anneal;
pub mod crossover;
pub mod differential;
pub mod driver;
pub mod local;
pub mod runner;
pub mod sampling;
pub mod shgo;

pub use self::driver::{optimize, FitOutcome};
pub use self::runner::{
    OptimizationOptions, OptimizationResult, Optimizer, ProgressCallback, Silent,
};

use crate::config::{DeVariant, StrategyKind};
use serde::{Deserialize, Serialize};

/// A global search strategy with its stopping rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    DifferentialEvolution {
        variant: DeVariant,
        max_iter: usize,
        tolerance: f64,
    },
    Shgo {
        samples: usize,
        iterations: usize,
    },
    DualAnnealing {
        max_iter: usize,
    },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::DifferentialEvolution { .. } => StrategyKind::DifferentialEvolution,
            Strategy::Shgo { .. } => StrategyKind::Shgo,
            Strategy::DualAnnealing { .. } => StrategyKind::DualAnnealing,
        }
    }

    /// Whether the objective is restricted to the per-scan fitting windows. Only differential
    /// evolution passes them; the other two score whole curves.
    pub fn uses_scan_bounds(&self) -> bool {
        matches!(self, Strategy::DifferentialEvolution { .. })
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::DifferentialEvolution {
            variant: DeVariant::CurrentToBest1Exp,
            max_iter: 25,
            tolerance: 0.1,
        }
    }
}
