//! Analysis output records.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::DofMap;
use crate::geometry::{Displacement, Force, Point};
use crate::truss::{MemberId, NodeId, TrussSystem};

/// Sign classification of a member's axial force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceState {
    /// Positive axial force.
    Tension,
    /// Negative axial force.
    Compression,
    /// Axial force negligible compared with the most loaded member.
    ZeroForce,
}

impl ForceState {
    /// Classify `axial_force`, treating magnitudes up to `tolerance` as zero.
    #[must_use]
    pub fn classify(axial_force: f64, tolerance: f64) -> Self {
        if axial_force.abs() <= tolerance {
            ForceState::ZeroForce
        } else if axial_force > 0.0 {
            ForceState::Tension
        } else {
            ForceState::Compression
        }
    }
}

/// How the solution was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Single linear solve in the undeformed geometry.
    Linear,
    /// Every load increment reached equilibrium.
    Converged {
        /// Number of load increments applied.
        increments: usize,
        /// Newton-Raphson iterations summed over all increments.
        iterations: usize,
    },
}

/// Convergence record of one load increment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncrementRecord {
    /// One-based increment number.
    pub increment: usize,
    /// Fraction of the total load applied at the end of the increment.
    pub load_factor: f64,
    /// Iterations needed to converge.
    pub iterations: usize,
    /// Convergence measure before the first and after every iteration.
    pub residuals: Vec<f64>,
}

/// Response of one node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// Node identifier.
    pub id: NodeId,
    /// Position in the deformed configuration.
    pub position: Point,
    /// Displacement from the undeformed position.
    pub displacement: Displacement,
    /// Support reaction; zero along free axes.
    pub reaction: Force,
}

/// Response of one member.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberResult {
    /// Member identifier.
    pub id: MemberId,
    /// Axial force in newtons, tension positive.
    pub axial_force: f64,
    /// Axial stress in pascals, tension positive.
    pub stress: f64,
    /// Length in the configuration the force was computed in.
    pub length: f64,
    /// Undeformed length.
    pub undeformed_length: f64,
    /// Tension, compression or zero-force.
    pub state: ForceState,
}

/// Complete result of a linear or nonlinear analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Solution status.
    pub status: SolverStatus,
    /// Node responses in degree-of-freedom order.
    pub nodes: Vec<NodeResult>,
    /// Member responses in member order.
    pub members: Vec<MemberResult>,
    /// Per-increment convergence history; empty for a linear solve.
    pub increments: Vec<IncrementRecord>,
}

/// Per-member quantities gathered by a solver before packaging.
pub(crate) struct MemberState {
    /// Axial force in newtons.
    pub axial_force: f64,
    /// Length in the solved configuration.
    pub length: f64,
    /// Undeformed length.
    pub undeformed_length: f64,
}

impl AnalysisResults {
    /// Package solver vectors into per-node and per-member records.
    pub(crate) fn collect(
        system: &TrussSystem,
        displacements: &DVector<f64>,
        reactions: &DVector<f64>,
        members: &[MemberState],
        status: SolverStatus,
        increments: Vec<IncrementRecord>,
    ) -> Self {
        let nodes = system
            .nodes()
            .enumerate()
            .map(|(index, node)| {
                let [x, y, z] = DofMap::node_dofs(index);
                let displacement =
                    Displacement::new(displacements[x], displacements[y], displacements[z]);
                NodeResult {
                    id: node.id,
                    position: node.position.displaced(displacement),
                    displacement,
                    reaction: Force::new(reactions[x], reactions[y], reactions[z]),
                }
            })
            .collect();

        let largest = members
            .iter()
            .map(|state| state.axial_force.abs())
            .fold(0.0, f64::max);
        let tolerance = largest * 1.0e-9;
        let members = system
            .members()
            .zip(members)
            .map(|(member, state)| MemberResult {
                id: member.id,
                axial_force: state.axial_force,
                stress: state.axial_force / member.area,
                length: state.length,
                undeformed_length: state.undeformed_length,
                state: ForceState::classify(state.axial_force, tolerance),
            })
            .collect();

        Self {
            status,
            nodes,
            members,
            increments,
        }
    }

    /// Displacement of a node.
    #[must_use]
    pub fn joint_displacement(&self, id: NodeId) -> Option<Displacement> {
        self.node(id).map(|node| node.displacement)
    }

    /// Support reaction at a node.
    #[must_use]
    pub fn reaction(&self, id: NodeId) -> Option<Force> {
        self.node(id).map(|node| node.reaction)
    }

    /// Axial force in a member.
    #[must_use]
    pub fn member_axial_force(&self, id: MemberId) -> Option<f64> {
        self.member(id).map(|member| member.axial_force)
    }

    /// Axial stress in a member.
    #[must_use]
    pub fn member_stress(&self, id: MemberId) -> Option<f64> {
        self.member(id).map(|member| member.stress)
    }

    /// Result record of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeResult> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Result record of a member.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<&MemberResult> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Node with the largest displacement magnitude and that magnitude.
    #[must_use]
    pub fn max_displacement(&self) -> Option<(NodeId, f64)> {
        self.nodes
            .iter()
            .map(|node| (node.id, node.displacement.magnitude()))
            .fold(None, |best, candidate| match best {
                Some((_, magnitude)) if magnitude >= candidate.1 => best,
                _ => Some(candidate),
            })
    }

    /// Vector sum of all support reactions.
    #[must_use]
    pub fn total_reaction(&self) -> Force {
        self.nodes
            .iter()
            .fold(Force::default(), |total, node| total + node.reaction)
    }

    /// Total Newton-Raphson iterations, or one for a linear solve.
    #[must_use]
    pub fn iterations(&self) -> usize {
        match self.status {
            SolverStatus::Linear => 1,
            SolverStatus::Converged { iterations, .. } => iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_respects_tolerance() {
        assert_eq!(ForceState::classify(10.0, 1.0), ForceState::Tension);
        assert_eq!(ForceState::classify(-10.0, 1.0), ForceState::Compression);
        assert_eq!(ForceState::classify(0.5, 1.0), ForceState::ZeroForce);
    }

    #[test]
    fn max_displacement_picks_largest_magnitude() {
        let node = |id, displacement| NodeResult {
            id: NodeId(id),
            position: Point::default(),
            displacement,
            reaction: Force::default(),
        };
        let results = AnalysisResults {
            status: SolverStatus::Linear,
            nodes: vec![
                node(1, Displacement::new(0.0, 0.0, 0.0)),
                node(2, Displacement::new(0.0, -0.003, 0.004)),
                node(3, Displacement::new(0.001, 0.0, 0.0)),
            ],
            members: Vec::new(),
            increments: Vec::new(),
        };
        let (id, magnitude) = results.max_displacement().expect("nodes present");
        assert_eq!(id, NodeId(2));
        assert!((magnitude - 0.005).abs() < 1.0e-15);
    }
}
