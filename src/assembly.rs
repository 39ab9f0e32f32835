//! Assembly of element contributions into global matrices and vectors.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::element::{self, ElementMatrix, ElementVector, MemberGeometry};
use crate::errors::AnalysisError;
use crate::geometry::Point;
use crate::truss::{NodeId, TrussSystem};

/// Degree-of-freedom table for one analysis.
///
/// Node `i` (in [`TrussSystem::nodes`] order) owns global indices
/// `3i`, `3i + 1` and `3i + 2`. The table also records the partition into
/// free and restrained indices, each list in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DofMap {
    /// Node identifiers in degree-of-freedom order.
    nodes: Vec<NodeId>,
    /// Global indices of unrestrained degrees of freedom.
    free: Vec<usize>,
    /// Global indices of restrained degrees of freedom.
    restrained: Vec<usize>,
}

impl DofMap {
    /// Build the table for `system`.
    #[must_use]
    pub fn new(system: &TrussSystem) -> Self {
        let mut nodes = Vec::with_capacity(system.node_count());
        let mut free = Vec::new();
        let mut restrained = Vec::new();
        for (index, node) in system.nodes().enumerate() {
            nodes.push(node.id);
            for axis in 0..3 {
                if node.restraint.is_fixed(axis) {
                    restrained.push(3 * index + axis);
                } else {
                    free.push(3 * index + axis);
                }
            }
        }
        Self {
            nodes,
            free,
            restrained,
        }
    }

    /// Total number of degrees of freedom.
    #[must_use]
    pub fn len(&self) -> usize {
        3 * self.nodes.len()
    }

    /// True when the table holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The three global indices of the node at dense index `node`.
    #[must_use]
    pub const fn node_dofs(node: usize) -> [usize; 3] {
        [3 * node, 3 * node + 1, 3 * node + 2]
    }

    /// The six global indices of a member joining dense nodes `start` and `end`.
    #[must_use]
    pub const fn member_dofs(start: usize, end: usize) -> [usize; 6] {
        [
            3 * start,
            3 * start + 1,
            3 * start + 2,
            3 * end,
            3 * end + 1,
            3 * end + 2,
        ]
    }

    /// Free global indices in ascending order.
    #[must_use]
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Restrained global indices in ascending order.
    #[must_use]
    pub fn restrained(&self) -> &[usize] {
        &self.restrained
    }

    /// Node and axis owning global index `dof`.
    #[must_use]
    pub fn owner(&self, dof: usize) -> Option<(NodeId, usize)> {
        self.nodes.get(dof / 3).map(|node| (*node, dof % 3))
    }

    /// Node identifiers in degree-of-freedom order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// Tangent stiffness and internal forces of a truss in some configuration.
#[derive(Clone, Debug)]
pub struct TangentSystem {
    /// Tangent stiffness `K_E + K_G`.
    pub stiffness: DMatrix<f64>,
    /// Internal nodal force vector.
    pub internal_force: DVector<f64>,
    /// Axial force per member, in member order.
    pub axial_forces: Vec<f64>,
    /// Current geometry per member, in member order.
    pub geometries: Vec<MemberGeometry>,
}

/// Add a 6×6 element matrix into `global` at `dofs`.
///
/// Entries are accumulated, so members sharing a node sum into the same rows
/// and columns.
pub fn scatter_matrix(global: &mut DMatrix<f64>, local: &ElementMatrix, dofs: &[usize; 6]) {
    for (row_local, global_row) in dofs.iter().enumerate() {
        for (col_local, global_col) in dofs.iter().enumerate() {
            global[(*global_row, *global_col)] += local[(row_local, col_local)];
        }
    }
}

/// Add a six-component element vector into `global` at `dofs`.
pub fn scatter_vector(global: &mut DVector<f64>, local: &ElementVector, dofs: &[usize; 6]) {
    for (row_local, global_row) in dofs.iter().enumerate() {
        global[*global_row] += local[row_local];
    }
}

/// Assemble the linear elastic stiffness matrix in the undeformed geometry.
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateGeometry`] for a zero-length member.
pub fn assemble_stiffness(
    system: &TrussSystem,
    dofs: &DofMap,
) -> Result<DMatrix<f64>, AnalysisError> {
    let positions = system.positions();
    let mut matrix = DMatrix::zeros(dofs.len(), dofs.len());
    for (member, start, end) in system.member_endpoints() {
        let geometry = MemberGeometry::between(member.id, positions[start], positions[end])?;
        let local =
            element::elastic_stiffness(&geometry, member.axial_rigidity() / geometry.length);
        scatter_matrix(&mut matrix, &local, &DofMap::member_dofs(start, end));
    }
    Ok(matrix)
}

/// Assemble the global nodal load vector.
#[must_use]
pub fn assemble_loads(system: &TrussSystem, dofs: &DofMap) -> DVector<f64> {
    let mut load = DVector::zeros(dofs.len());
    for (index, node) in system.nodes().enumerate() {
        for (axis, dof) in DofMap::node_dofs(index).into_iter().enumerate() {
            load[dof] += node.load.component(axis);
        }
    }
    load
}

/// Assemble the tangent system in the configuration `positions`.
///
/// Axial forces follow the true-stretch measure `N = EA·(ℓ − L)/L`, where `ℓ`
/// is the current and `L` the undeformed length. The elastic part uses the
/// undeformed `EA/L` so the tangent is the exact derivative of the internal
/// force vector.
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateGeometry`] when a member collapses.
pub fn assemble_tangent(
    system: &TrussSystem,
    dofs: &DofMap,
    positions: &[Point],
) -> Result<TangentSystem, AnalysisError> {
    let undeformed = system.positions();
    let mut stiffness = DMatrix::zeros(dofs.len(), dofs.len());
    let mut internal_force = DVector::zeros(dofs.len());
    let mut axial_forces = Vec::with_capacity(system.member_count());
    let mut geometries = Vec::with_capacity(system.member_count());
    for (member, start, end) in system.member_endpoints() {
        let reference = MemberGeometry::between(member.id, undeformed[start], undeformed[end])?;
        let current = MemberGeometry::between(member.id, positions[start], positions[end])?;
        let ea_over_l = member.axial_rigidity() / reference.length;
        let axial_force = ea_over_l * (current.length - reference.length);

        let local = element::elastic_stiffness(&current, ea_over_l)
            + element::geometric_stiffness(&current, axial_force);
        let member_dofs = DofMap::member_dofs(start, end);
        scatter_matrix(&mut stiffness, &local, &member_dofs);
        scatter_vector(
            &mut internal_force,
            &element::end_forces(&current, axial_force),
            &member_dofs,
        );
        axial_forces.push(axial_force);
        geometries.push(current);
    }
    Ok(TangentSystem {
        stiffness,
        internal_force,
        axial_forces,
        geometries,
    })
}

/// Displacements of a member's start and end nodes read from a global vector.
#[must_use]
pub fn member_end_displacements(
    displacements: &DVector<f64>,
    start: usize,
    end: usize,
) -> (Vector3<f64>, Vector3<f64>) {
    let [sx, sy, sz] = DofMap::node_dofs(start);
    let [ex, ey, ez] = DofMap::node_dofs(end);
    (
        Vector3::new(displacements[sx], displacements[sy], displacements[sz]),
        Vector3::new(displacements[ex], displacements[ey], displacements[ez]),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{force, point, Restraint};
    use crate::truss::MemberId;

    fn triangle() -> TrussSystem {
        let mut truss = TrussSystem::new();
        for (id, position) in [
            (1, point(0.0, 0.0, 0.0)),
            (2, point(4.0, 0.0, 0.0)),
            (3, point(2.0, 3.0, 0.0)),
        ] {
            truss.add_node(NodeId(id), position).expect("node added");
        }
        for (id, start, end) in [(1, 1, 2), (2, 2, 3), (3, 3, 1)] {
            truss
                .add_member(MemberId(id), NodeId(start), NodeId(end), 200.0e9, 0.002)
                .expect("member added");
        }
        truss
            .set_restraint(NodeId(1), Restraint::FIXED)
            .expect("restraint applied");
        truss
            .set_restraint(NodeId(2), Restraint::from_mask(0b110))
            .expect("restraint applied");
        truss
            .add_load(NodeId(3), force(1.0e3, -5.0e3, 0.0))
            .expect("load applied");
        truss
    }

    #[test]
    fn dof_map_partitions_free_and_restrained() {
        let truss = triangle();
        let dofs = DofMap::new(&truss);
        assert_eq!(dofs.len(), 9);
        assert_eq!(dofs.restrained(), &[0, 1, 2, 4, 5]);
        assert_eq!(dofs.free(), &[3, 6, 7, 8]);
        assert_eq!(dofs.free().len(), truss.free_dof_count());
        assert_eq!(dofs.owner(7), Some((NodeId(3), 1)));
    }

    #[test]
    fn shared_nodes_accumulate_stiffness() {
        let truss = triangle();
        let dofs = DofMap::new(&truss);
        let k = assemble_stiffness(&truss, &dofs).expect("assembly succeeds");

        // Node 1 x-stiffness: bar 1-2 contributes EA/L, bar 3-1 contributes EA/L·l².
        let ea = 200.0e9 * 0.002;
        let diagonal_length = 13.0_f64.sqrt();
        let expected = ea / 4.0 + ea / diagonal_length * (2.0 / diagonal_length).powi(2);
        assert_relative_eq!(k[(0, 0)], expected, max_relative = 1.0e-12);
        assert_relative_eq!(k, k.transpose(), max_relative = 1.0e-12);
    }

    #[test]
    fn load_vector_collects_nodal_loads() {
        let truss = triangle();
        let dofs = DofMap::new(&truss);
        let load = assemble_loads(&truss, &dofs);
        assert_eq!(load[6], 1.0e3);
        assert_eq!(load[7], -5.0e3);
        assert_eq!(load.iter().filter(|value| **value != 0.0).count(), 2);
    }

    #[test]
    fn tangent_in_reference_configuration_is_elastic() {
        let truss = triangle();
        let dofs = DofMap::new(&truss);
        let elastic = assemble_stiffness(&truss, &dofs).expect("assembly succeeds");
        let tangent =
            assemble_tangent(&truss, &dofs, &truss.positions()).expect("assembly succeeds");
        assert_relative_eq!(tangent.stiffness, elastic, max_relative = 1.0e-12);
        assert!(tangent.axial_forces.iter().all(|force| *force == 0.0));
        assert!(tangent.internal_force.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn stretched_member_reports_tension() {
        let truss = triangle();
        let dofs = DofMap::new(&truss);
        let mut positions = truss.positions();
        positions[1] = point(4.001, 0.0, 0.0);
        let tangent = assemble_tangent(&truss, &dofs, &positions).expect("assembly succeeds");
        let expected = 200.0e9 * 0.002 / 4.0 * 0.001;
        assert_relative_eq!(tangent.axial_forces[0], expected, max_relative = 1.0e-6);
        // Internal forces of a self-equilibrated member set sum to zero.
        let sum_x: f64 = (0..3).map(|node| tangent.internal_force[3 * node]).sum();
        assert_relative_eq!(sum_x, 0.0, epsilon = 1.0e-6);
    }
}
