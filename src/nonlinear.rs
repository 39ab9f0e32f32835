//! Incremental Newton-Raphson solver for geometrically nonlinear trusses.
//!
//! The load is applied in equal increments. Within an increment the tangent
//! stiffness is re-assembled in the current (deformed) configuration after
//! every correction, and member forces follow the true-stretch measure, so
//! lengths, direction cosines and axial forces always reflect the updated
//! geometry.

use log::{debug, info, trace};
use nalgebra::DVector;

use crate::analysis::{ConvergenceNorm, SolverConfig};
use crate::assembly::{self, DofMap, TangentSystem};
use crate::errors::AnalysisError;
use crate::geometry::{Displacement, Point};
use crate::linear::{partition, partition_vector, Factorization};
use crate::results::{AnalysisResults, IncrementRecord, MemberState, SolverStatus};
use crate::truss::TrussSystem;

/// Denominators below this are treated as zero when normalising residuals.
const NORM_FLOOR: f64 = 1.0e-30;

/// Progress of a nonlinear solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverPhase {
    /// No increment has been applied yet.
    NotStarted,
    /// The load of `increment` has just been applied.
    Incrementing {
        /// One-based increment number.
        increment: usize,
    },
    /// Equilibrium iterations are running inside `increment`.
    Iterating {
        /// One-based increment number.
        increment: usize,
        /// Iterations completed so far.
        iteration: usize,
    },
    /// Every increment reached equilibrium.
    Converged,
    /// An increment exhausted its iteration budget.
    Diverged {
        /// One-based increment number that failed.
        increment: usize,
    },
}

/// Newton-Raphson driver holding the evolving state of one analysis.
///
/// The model itself is only borrowed; all mutable state (displacements and
/// history) lives in the driver and is discarded with it.
pub struct NewtonRaphson<'a> {
    /// Model being analysed.
    system: &'a TrussSystem,
    /// Increment count, tolerances and iteration budget.
    config: &'a SolverConfig,
    /// Degree-of-freedom numbering of `system`.
    dofs: DofMap,
    /// Undeformed node positions.
    reference: Vec<Point>,
    /// Full reference load vector.
    loads: DVector<f64>,
    /// Norm of the reference load at the free degrees of freedom.
    load_norm: f64,
    /// Accumulated global displacements.
    displacements: DVector<f64>,
    /// Current state of the driver.
    phase: SolverPhase,
    /// One record per converged increment.
    history: Vec<IncrementRecord>,
    /// Equilibrium iterations summed over all increments.
    iterations: usize,
}

impl<'a> NewtonRaphson<'a> {
    /// Prepare a solve of `system` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] when the model or the options are
    /// malformed.
    pub fn new(system: &'a TrussSystem, config: &'a SolverConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        system.validate()?;
        let dofs = DofMap::new(system);
        let loads = assembly::assemble_loads(system, &dofs);
        let load_norm = partition_vector(&loads, dofs.free()).norm();
        let displacements = DVector::zeros(dofs.len());
        Ok(Self {
            system,
            config,
            reference: system.positions(),
            dofs,
            loads,
            load_norm,
            displacements,
            phase: SolverPhase::NotStarted,
            history: Vec::with_capacity(config.load_increments),
            iterations: 0,
        })
    }

    /// Current phase of the solve.
    #[must_use]
    pub fn phase(&self) -> SolverPhase {
        self.phase
    }

    /// Convergence records of the increments completed so far.
    #[must_use]
    pub fn history(&self) -> &[IncrementRecord] {
        &self.history
    }

    /// Move to `phase`, tracing the change.
    fn transition(&mut self, phase: SolverPhase) {
        trace!("newton-raphson: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Node positions in the current configuration.
    fn current_positions(&self) -> Vec<Point> {
        self.reference
            .iter()
            .enumerate()
            .map(|(index, position)| {
                let [x, y, z] = DofMap::node_dofs(index);
                position.displaced(Displacement::new(
                    self.displacements[x],
                    self.displacements[y],
                    self.displacements[z],
                ))
            })
            .collect()
    }

    /// Tangent stiffness and internal forces at the current configuration.
    fn tangent(&self) -> Result<TangentSystem, AnalysisError> {
        assembly::assemble_tangent(self.system, &self.dofs, &self.current_positions())
    }

    /// Out-of-balance force at the free degrees of freedom.
    fn residual(&self, tangent: &TangentSystem, load_factor: f64) -> DVector<f64> {
        let external = &self.loads * load_factor;
        partition_vector(&(external - &tangent.internal_force), self.dofs.free())
    }

    /// Residual norm relative to the reference load, or absolute under no load.
    fn force_measure(&self, residual: &DVector<f64>) -> f64 {
        if self.load_norm > NORM_FLOOR {
            residual.norm() / self.load_norm
        } else {
            residual.norm()
        }
    }

    /// Apply the next load increment and iterate to equilibrium.
    ///
    /// Returns `Ok(true)` while further increments remain.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NonConvergence`] when the iteration budget is
    /// exhausted, or [`AnalysisError::SingularStiffness`] /
    /// [`AnalysisError::DegenerateGeometry`] when the tangent breaks down.
    pub fn step(&mut self) -> Result<bool, AnalysisError> {
        let increment = match self.phase {
            SolverPhase::NotStarted => 1,
            SolverPhase::Incrementing { increment } | SolverPhase::Iterating { increment, .. } => {
                increment + 1
            }
            SolverPhase::Converged | SolverPhase::Diverged { .. } => return Ok(false),
        };
        let outcome = self.increment(increment);
        if outcome.is_err() {
            self.transition(SolverPhase::Diverged { increment });
        }
        outcome
    }

    /// Body of [`NewtonRaphson::step`] for one increment.
    fn increment(&mut self, increment: usize) -> Result<bool, AnalysisError> {
        let total = self.config.load_increments;
        let load_factor = increment as f64 / total as f64;
        self.transition(SolverPhase::Incrementing { increment });

        let mut tangent = self.tangent()?;
        let mut residual = self.residual(&tangent, load_factor);
        let mut measure = self.force_measure(&residual);
        let mut residuals = vec![measure];
        let mut iteration = 0;
        let mut converged = measure <= self.config.tolerance;

        while !converged {
            if iteration == self.config.max_iterations {
                return Err(AnalysisError::NonConvergence {
                    increment,
                    iterations: iteration,
                    residual: measure,
                });
            }
            iteration += 1;
            self.transition(SolverPhase::Iterating {
                increment,
                iteration,
            });

            let k_ff = partition(&tangent.stiffness, self.dofs.free(), self.dofs.free());
            let correction =
                Factorization::new(k_ff, &self.dofs, self.config.singularity_threshold)?
                    .solve(&residual, &self.dofs)?;
            for (index, dof) in self.dofs.free().iter().enumerate() {
                self.displacements[*dof] += correction[index];
            }

            tangent = self.tangent()?;
            residual = self.residual(&tangent, load_factor);
            measure = self.force_measure(&residual);
            residuals.push(measure);

            converged = match self.config.convergence {
                ConvergenceNorm::Force => measure <= self.config.tolerance,
                ConvergenceNorm::Displacement => {
                    let total_norm =
                        partition_vector(&self.displacements, self.dofs.free()).norm();
                    correction.norm()
                        <= self.config.displacement_tolerance * total_norm.max(NORM_FLOOR)
                }
            };
            debug!("increment {increment} iteration {iteration}: residual {measure:e}");
        }

        info!(
            "increment {increment}/{total} converged in {iteration} iterations \
             (load factor {load_factor:.3})"
        );
        self.iterations += iteration;
        self.history.push(IncrementRecord {
            increment,
            load_factor,
            iterations: iteration,
            residuals,
        });
        if increment == total {
            self.transition(SolverPhase::Converged);
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Run every remaining increment and package the final equilibrium state.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from [`NewtonRaphson::step`].
    pub fn run(mut self) -> Result<AnalysisResults, AnalysisError> {
        while self.step()? {}
        self.finish()
    }

    /// Recover member forces and reactions from the converged state.
    fn finish(self) -> Result<AnalysisResults, AnalysisError> {
        let tangent = self.tangent()?;
        let mut reactions = DVector::zeros(self.dofs.len());
        for dof in self.dofs.restrained() {
            reactions[*dof] = tangent.internal_force[*dof] - self.loads[*dof];
        }

        let members: Vec<MemberState> = self
            .system
            .member_endpoints()
            .zip(tangent.axial_forces.iter().zip(&tangent.geometries))
            .map(|((_, start, end), (axial_force, geometry))| MemberState {
                axial_force: *axial_force,
                length: geometry.length,
                undeformed_length: (self.reference[end].to_vector()
                    - self.reference[start].to_vector())
                .norm(),
            })
            .collect();

        Ok(AnalysisResults::collect(
            self.system,
            &self.displacements,
            &reactions,
            &members,
            SolverStatus::Converged {
                increments: self.config.load_increments,
                iterations: self.iterations,
            },
            self.history,
        ))
    }
}

/// Geometrically nonlinear analysis by incremental Newton-Raphson.
///
/// # Errors
///
/// Returns [`AnalysisError`] for invalid input, a singular tangent or an
/// increment that fails to converge.
pub fn solve_nonlinear(
    system: &TrussSystem,
    config: &SolverConfig,
) -> Result<AnalysisResults, AnalysisError> {
    NewtonRaphson::new(system, config)?.run()
}
