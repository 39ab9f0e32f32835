//! Partitioned direct solve of the linear stiffness equations.
//!
//! The global system is split into free (`f`) and restrained (`r`) degrees of
//! freedom. With zero support displacements,
//!
//! ```text
//! K_ff · U_f = F_f
//! R_r       = K_rf · U_f − F_r
//! ```

use log::debug;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn, LU};

use crate::analysis::SolverConfig;
use crate::assembly::{self, DofMap};
use crate::element::MemberGeometry;
use crate::errors::AnalysisError;
use crate::results::{AnalysisResults, MemberState, SolverStatus};
use crate::truss::{NodeId, TrussSystem};

/// Factorised reduced stiffness matrix.
///
/// Cholesky is tried first. Tangent matrices of compressed structures can be
/// indefinite, in which case partial-pivoting LU is used.
pub enum Factorization {
    /// `K_ff = L Lᵀ`.
    Cholesky(Cholesky<f64, Dyn>),
    /// `P K_ff = L U`.
    Lu(LU<f64, Dyn, Dyn>),
}

impl Factorization {
    /// Factorise `matrix` and reject it when it is numerically singular.
    ///
    /// The conditioning measure is the ratio of the smallest to the largest
    /// pivot magnitude. It is a cheap lower bound on the reciprocal condition
    /// number, so anything below `threshold` is certainly ill-conditioned.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SingularStiffness`] naming the node and axis
    /// of the weakest pivot.
    pub fn new(matrix: DMatrix<f64>, dofs: &DofMap, threshold: f64) -> Result<Self, AnalysisError> {
        if let Some(cholesky) = Cholesky::new(matrix.clone()) {
            let pivots: Vec<f64> = (0..matrix.nrows())
                .map(|i| cholesky.l_dirty()[(i, i)].powi(2))
                .collect();
            if pivots.iter().all(|pivot| pivot.is_finite() && *pivot > 0.0) {
                check_pivots(&pivots, dofs, threshold)?;
                return Ok(Self::Cholesky(cholesky));
            }
        }
        let lu = LU::new(matrix);
        let u = lu.u();
        let pivots: Vec<f64> = (0..u.nrows()).map(|i| u[(i, i)].abs()).collect();
        check_pivots(&pivots, dofs, threshold)?;
        Ok(Self::Lu(lu))
    }

    /// Solve for `rhs`, failing if the result is not finite.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SingularStiffness`] when back-substitution
    /// breaks down.
    pub fn solve(&self, rhs: &DVector<f64>, dofs: &DofMap) -> Result<DVector<f64>, AnalysisError> {
        let solution = match self {
            Self::Cholesky(cholesky) => Some(cholesky.solve(rhs)),
            Self::Lu(lu) => lu.solve(rhs),
        };
        match solution {
            Some(solution) if solution.iter().all(|value| value.is_finite()) => Ok(solution),
            _ => Err(singular(dofs, 0, 0.0)),
        }
    }
}

/// Fail when the pivot spread indicates a (near-)singular matrix.
fn check_pivots(pivots: &[f64], dofs: &DofMap, threshold: f64) -> Result<(), AnalysisError> {
    let pivots: Vec<f64> = pivots
        .iter()
        .map(|pivot| if pivot.is_finite() { pivot.abs() } else { 0.0 })
        .collect();
    let largest = pivots.iter().copied().fold(0.0, f64::max);
    let (weakest, smallest) = pivots
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (index, pivot)| {
            if pivot < best.1 {
                (index, pivot)
            } else {
                best
            }
        });
    let ratio = if largest > 0.0 { smallest / largest } else { 0.0 };
    if !(ratio >= threshold) {
        debug!("rejecting factorisation: pivot ratio {ratio:e} at free dof {weakest}");
        return Err(singular(dofs, weakest, ratio));
    }
    Ok(())
}

/// Build a singularity error for free degree of freedom `free_index`.
fn singular(dofs: &DofMap, free_index: usize, pivot_ratio: f64) -> AnalysisError {
    let (node, axis) = dofs
        .free()
        .get(free_index)
        .and_then(|dof| dofs.owner(*dof))
        .or_else(|| dofs.nodes().first().map(|node| (*node, 0)))
        .unwrap_or((NodeId(0), 0));
    AnalysisError::SingularStiffness {
        node,
        axis,
        pivot_ratio,
    }
}

/// Extract the sub-matrix with rows `rows` and columns `cols`.
#[must_use]
pub fn partition(matrix: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| matrix[(rows[i], cols[j])])
}

/// Extract the entries `indices` of `vector`.
#[must_use]
pub fn partition_vector(vector: &DVector<f64>, indices: &[usize]) -> DVector<f64> {
    DVector::from_fn(indices.len(), |i, _| vector[indices[i]])
}

/// Solve `K_ff · U_f = rhs_f` and scatter the result into a full-length vector.
///
/// # Errors
///
/// Returns [`AnalysisError::SingularStiffness`] when `K_ff` is singular.
pub fn solve_free(
    stiffness: &DMatrix<f64>,
    rhs: &DVector<f64>,
    dofs: &DofMap,
    threshold: f64,
) -> Result<DVector<f64>, AnalysisError> {
    let mut full = DVector::zeros(dofs.len());
    let free = dofs.free();
    if free.is_empty() {
        return Ok(full);
    }
    let k_ff = partition(stiffness, free, free);
    let rhs_f = partition_vector(rhs, free);
    let solution = Factorization::new(k_ff, dofs, threshold)?.solve(&rhs_f, dofs)?;
    for (index, dof) in free.iter().enumerate() {
        full[*dof] = solution[index];
    }
    Ok(full)
}

/// Reactions `K·U − F` at restrained degrees of freedom; zero elsewhere.
#[must_use]
pub fn reactions(
    stiffness: &DMatrix<f64>,
    displacements: &DVector<f64>,
    loads: &DVector<f64>,
    dofs: &DofMap,
) -> DVector<f64> {
    let mut reactions = DVector::zeros(dofs.len());
    for dof in dofs.restrained() {
        let resisted: f64 = stiffness.row(*dof).dot(&displacements.transpose());
        reactions[*dof] = resisted - loads[*dof];
    }
    reactions
}

/// Linear static analysis in the undeformed geometry.
///
/// # Errors
///
/// Returns [`AnalysisError`] for invalid input or a singular stiffness matrix.
pub fn solve_linear(
    system: &TrussSystem,
    config: &SolverConfig,
) -> Result<AnalysisResults, AnalysisError> {
    system.validate()?;
    let dofs = DofMap::new(system);
    let stiffness = assembly::assemble_stiffness(system, &dofs)?;
    let loads = assembly::assemble_loads(system, &dofs);
    let displacements = solve_free(&stiffness, &loads, &dofs, config.singularity_threshold)?;
    let reactions = reactions(&stiffness, &displacements, &loads, &dofs);

    let positions = system.positions();
    let mut members = Vec::with_capacity(system.member_count());
    for (member, start, end) in system.member_endpoints() {
        let geometry = MemberGeometry::between(member.id, positions[start], positions[end])?;
        let (start_disp, end_disp) = assembly::member_end_displacements(&displacements, start, end);
        let elongation = geometry.axial_elongation(start_disp, end_disp);
        members.push(MemberState {
            axial_force: member.axial_rigidity() / geometry.length * elongation,
            length: geometry.length,
            undeformed_length: geometry.length,
        });
    }
    debug!(
        "linear solve: {} free dofs, max |u| = {:e}",
        dofs.free().len(),
        displacements.amax()
    );

    Ok(AnalysisResults::collect(
        system,
        &displacements,
        &reactions,
        &members,
        SolverStatus::Linear,
        Vec::new(),
    ))
}
