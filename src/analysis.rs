//! Analysis options and the entry point that dispatches to a solver.

use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, InputError};
use crate::results::AnalysisResults;
use crate::truss::TrussSystem;
use crate::{linear, nonlinear};

/// Type of structural analysis to perform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// First-order analysis in the undeformed geometry.
    #[default]
    Linear,
    /// Incremental Newton-Raphson with geometric nonlinearity.
    Nonlinear,
}

/// Quantity compared against the tolerance to declare an increment converged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceNorm {
    /// Out-of-balance force norm relative to the total applied load norm.
    #[default]
    Force,
    /// Displacement correction norm relative to the accumulated displacement norm.
    Displacement,
}

/// Options for a structural analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Linear or nonlinear analysis.
    pub mode: AnalysisMode,
    /// Number of equal load increments for nonlinear analysis.
    pub load_increments: usize,
    /// Relative force residual tolerance.
    pub tolerance: f64,
    /// Relative displacement correction tolerance.
    pub displacement_tolerance: f64,
    /// Measure used for the convergence check.
    pub convergence: ConvergenceNorm,
    /// Maximum Newton-Raphson iterations per increment.
    pub max_iterations: usize,
    /// Smallest admissible ratio between the smallest and largest pivot.
    pub singularity_threshold: f64,
    /// Reject models with fewer than six restrained DOFs before assembling.
    pub check_stability: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Linear,
            load_increments: 10,
            tolerance: 1.0e-6,
            displacement_tolerance: 1.0e-9,
            convergence: ConvergenceNorm::Force,
            max_iterations: 30,
            singularity_threshold: 1.0e-12,
            check_stability: false,
        }
    }
}

impl SolverConfig {
    /// Options for a linear analysis.
    #[must_use]
    pub fn linear() -> Self {
        Self::default()
    }

    /// Options for a nonlinear analysis with `load_increments` equal steps.
    #[must_use]
    pub fn nonlinear(load_increments: usize) -> Self {
        Self {
            mode: AnalysisMode::Nonlinear,
            load_increments,
            ..Self::default()
        }
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of iterations per increment.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Select the convergence measure.
    #[must_use]
    pub fn with_convergence(mut self, convergence: ConvergenceNorm) -> Self {
        self.convergence = convergence;
        self
    }

    /// Enable the restraint count check.
    #[must_use]
    pub fn with_stability_check(mut self) -> Self {
        self.check_stability = true;
        self
    }

    /// Check that the numeric options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidParameter`] naming the first bad option.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.mode == AnalysisMode::Nonlinear && self.load_increments == 0 {
            return Err(invalid("load_increments", "must be at least 1"));
        }
        if self.mode == AnalysisMode::Nonlinear && self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        if !(self.tolerance > 0.0) {
            return Err(invalid("tolerance", "must be positive"));
        }
        if !(self.displacement_tolerance > 0.0) {
            return Err(invalid("displacement_tolerance", "must be positive"));
        }
        if !(self.singularity_threshold > 0.0 && self.singularity_threshold < 1.0) {
            return Err(invalid("singularity_threshold", "must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Build an [`InputError::InvalidParameter`].
pub(crate) fn invalid(name: &'static str, reason: &str) -> InputError {
    InputError::InvalidParameter {
        name,
        reason: reason.to_owned(),
    }
}

/// Analyse `system` with the requested solver.
///
/// The system is only borrowed; repeated calls with the same inputs return
/// identical results.
///
/// # Errors
///
/// Returns [`AnalysisError`] for invalid input, a singular stiffness matrix or
/// a nonlinear increment that fails to converge.
///
/// # Examples
/// ```
/// use spacetruss::{analyze, force, point, MemberId, NodeId, Restraint, SolverConfig, TrussSystem};
///
/// let mut truss = TrussSystem::new();
/// truss.add_node(NodeId(1), point(0.0, 0.0, 0.0))?;
/// truss.add_node(NodeId(2), point(1.0, 0.0, 0.0))?;
/// truss.set_restraint(NodeId(1), Restraint::FIXED)?;
/// truss.set_restraint(NodeId(2), Restraint::from_mask(0b110))?;
/// truss.add_load(NodeId(2), force(-1_000.0, 0.0, 0.0))?;
/// truss.add_member(MemberId(1), NodeId(1), NodeId(2), 200.0e9, 0.01)?;
///
/// let results = analyze(&truss, &SolverConfig::linear())?;
/// let ux = results.joint_displacement(NodeId(2)).map(|d| d.x);
/// assert!(ux.is_some_and(|ux| (ux + 5.0e-7).abs() < 1.0e-15));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn analyze(
    system: &TrussSystem,
    config: &SolverConfig,
) -> Result<AnalysisResults, AnalysisError> {
    config.validate()?;
    system.validate()?;
    if config.check_stability {
        system.check_restraints()?;
    }
    match config.mode {
        AnalysisMode::Linear => linear::solve_linear(system, config),
        AnalysisMode::Nonlinear => nonlinear::solve_nonlinear(system, config),
    }
}
