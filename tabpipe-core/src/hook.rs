//! Pre/post optimization wrapping for mutating operations

use crate::dataset::Dataset;
use crate::error::Error;
use crate::optimize::{ColumnOptimizer, OptimizationReport};

/// Reports from the two optimization passes a hook performs
#[derive(Debug, Clone)]
pub struct HookReport {
    /// Report from the pass before the wrapped operation ran
    pub before: OptimizationReport,

    /// Report from the pass after the wrapped operation returned
    pub after: OptimizationReport,
}

/// Wraps a mutating dataset operation between two optimization passes
///
/// The post pass runs whether the operation succeeds or fails, so the
/// dataset always leaves the hook in its narrowest representation. A
/// failing operation's error is propagated unmasked; the post pass's own
/// outcome never replaces it.
#[derive(Debug, Clone)]
pub struct OptimizationHook {
    optimizer: ColumnOptimizer,
}

impl OptimizationHook {
    /// Create a hook around the given optimizer
    pub fn new(optimizer: ColumnOptimizer) -> Self {
        Self { optimizer }
    }

    /// Create a hook with a default-configured optimizer
    pub fn with_defaults() -> Self {
        Self::new(ColumnOptimizer::with_defaults())
    }

    /// Run `op` on the dataset, optimizing before and after
    pub fn around<R, E, F>(
        &self,
        dataset: &mut Dataset,
        op: F,
    ) -> std::result::Result<(R, HookReport), E>
    where
        F: FnOnce(&mut Dataset) -> std::result::Result<R, E>,
        E: From<Error>,
    {
        let before = self.optimizer.optimize(dataset).map_err(E::from)?;

        let result = op(dataset);

        // The post pass runs on whatever state `op` left behind, even when
        // `op` failed.
        let post = self.optimizer.optimize(dataset);

        match result {
            Ok(value) => {
                let after = post.map_err(E::from)?;
                Ok((value, HookReport { before, after }))
            }
            Err(err) => Err(err),
        }
    }
}
