//! Element formulation for a two-node axial bar in global axes.
//!
//! With direction cosines `c = (l, m, n)` and the transformation vector
//! `t = [-c, c]`, the elastic stiffness of a bar is
//!
//! ```text
//! k_E = (EA/L) · t tᵀ
//! ```
//!
//! and the geometric stiffness produced by an axial force `N` is
//!
//! ```text
//! k_G = (N/L) · [ P  -P ]      P = I₃ − c cᵀ
//!               [ -P  P ]
//! ```
//!
//! Both matrices are symmetric. `k_E` is rank one along the member axis and
//! `k_G` acts only orthogonal to it.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::errors::AnalysisError;
use crate::geometry::Point;
use crate::truss::MemberId;

/// 6×6 element matrix ordered `[start x, y, z, end x, y, z]`.
pub type ElementMatrix = SMatrix<f64, 6, 6>;

/// Six-component element vector in the same ordering as [`ElementMatrix`].
pub type ElementVector = SVector<f64, 6>;

/// Members shorter than this (in metres) are treated as degenerate.
pub const MIN_MEMBER_LENGTH: f64 = 1.0e-10;

/// Length and orientation of a member in a given configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemberGeometry {
    /// Distance between the end nodes.
    pub length: f64,
    /// Unit vector from the start node to the end node, `(l, m, n)`.
    pub cosines: Vector3<f64>,
}

impl MemberGeometry {
    /// Compute the geometry of `member` spanning `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DegenerateGeometry`] when the two positions
    /// coincide to within [`MIN_MEMBER_LENGTH`].
    ///
    /// # Examples
    /// ```
    /// use spacetruss::{point, MemberGeometry, MemberId};
    ///
    /// let (start, end) = (point(0.0, 0.0, 0.0), point(3.0, 4.0, 0.0));
    /// let geometry = MemberGeometry::between(MemberId(1), start, end)
    ///     .expect("non-degenerate member");
    /// assert_eq!(geometry.length, 5.0);
    /// assert_eq!(geometry.cosines.x, 0.6);
    /// ```
    pub fn between(member: MemberId, start: Point, end: Point) -> Result<Self, AnalysisError> {
        let delta = end.to_vector() - start.to_vector();
        let length = delta.norm();
        if !(length > MIN_MEMBER_LENGTH) {
            return Err(AnalysisError::DegenerateGeometry { member, length });
        }
        Ok(Self {
            length,
            cosines: delta / length,
        })
    }

    /// Transformation vector `[-l, -m, -n, l, m, n]`.
    #[must_use]
    pub fn transformation(&self) -> ElementVector {
        let c = self.cosines;
        ElementVector::from_column_slice(&[-c.x, -c.y, -c.z, c.x, c.y, c.z])
    }

    /// Elongation along the member axis produced by end displacements.
    #[must_use]
    pub fn axial_elongation(&self, start: Vector3<f64>, end: Vector3<f64>) -> f64 {
        self.cosines.dot(&(end - start))
    }
}

/// Elastic stiffness `k = (EA/L)·t tᵀ` for a member with axial stiffness `ea_over_l`.
#[must_use]
pub fn elastic_stiffness(geometry: &MemberGeometry, ea_over_l: f64) -> ElementMatrix {
    let t = geometry.transformation();
    (t * t.transpose()) * ea_over_l
}

/// Geometric stiffness produced by axial force `axial_force` (tension positive).
///
/// Tension stiffens the member transversely, compression softens it.
#[must_use]
pub fn geometric_stiffness(geometry: &MemberGeometry, axial_force: f64) -> ElementMatrix {
    let c = geometry.cosines;
    let projector = (Matrix3::identity() - c * c.transpose()) * (axial_force / geometry.length);
    let mut k = ElementMatrix::zeros();
    k.fixed_view_mut::<3, 3>(0, 0).copy_from(&projector);
    k.fixed_view_mut::<3, 3>(3, 3).copy_from(&projector);
    k.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-projector));
    k.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-projector));
    k
}

/// Nodal forces the member exerts on its end nodes for axial force `axial_force`.
#[must_use]
pub fn end_forces(geometry: &MemberGeometry, axial_force: f64) -> ElementVector {
    geometry.transformation() * axial_force
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    fn diagonal_member() -> MemberGeometry {
        MemberGeometry::between(MemberId(1), point(0.0, 0.0, 0.0), point(1.0, 2.0, 2.0))
            .expect("valid member")
    }

    #[test]
    fn direction_cosines_are_unit_length() {
        let geometry = diagonal_member();
        assert_relative_eq!(geometry.length, 3.0, epsilon = 1.0e-12);
        assert_relative_eq!(geometry.cosines.norm(), 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(geometry.cosines.y, 2.0 / 3.0, epsilon = 1.0e-12);
    }

    #[test]
    fn coincident_nodes_are_degenerate() {
        let error = MemberGeometry::between(MemberId(4), point(1.0, 1.0, 1.0), point(1.0, 1.0, 1.0))
            .expect_err("zero length detected");
        assert!(matches!(
            error,
            AnalysisError::DegenerateGeometry {
                member: MemberId(4),
                ..
            }
        ));
    }

    #[test]
    fn elastic_stiffness_matches_axial_pattern() {
        let geometry =
            MemberGeometry::between(MemberId(1), point(0.0, 0.0, 0.0), point(2.0, 0.0, 0.0))
                .expect("valid member");
        let k = elastic_stiffness(&geometry, 1.0e6);
        assert_relative_eq!(k[(0, 0)], 1.0e6);
        assert_relative_eq!(k[(0, 3)], -1.0e6);
        assert_relative_eq!(k[(3, 3)], 1.0e6);
        assert_relative_eq!(k[(1, 1)], 0.0);
        assert_relative_eq!(k, k.transpose());
    }

    #[test]
    fn elastic_stiffness_has_no_transverse_resistance() {
        let geometry = diagonal_member();
        let k = elastic_stiffness(&geometry, 5.0e7);
        let c = geometry.cosines;
        // Rigid translation and a transverse motion of the end node are both stress free.
        let translation = ElementVector::from_column_slice(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let transverse = Vector3::new(2.0, -1.0, 0.0);
        assert_relative_eq!(transverse.dot(&c), 0.0, epsilon = 1.0e-12);
        let sway = ElementVector::from_column_slice(&[0.0, 0.0, 0.0, 2.0, -1.0, 0.0]);
        assert_relative_eq!((k * translation).norm(), 0.0, epsilon = 1.0e-6);
        assert_relative_eq!((k * sway).norm(), 0.0, epsilon = 1.0e-6);
    }

    #[test]
    fn geometric_stiffness_acts_orthogonal_to_axis() {
        let geometry = diagonal_member();
        let k = geometric_stiffness(&geometry, 3.0e3);
        let axial = geometry.transformation();
        assert_relative_eq!((k * axial).norm(), 0.0, epsilon = 1.0e-9);
        assert_relative_eq!(k, k.transpose(), epsilon = 1.0e-12);

        let sway = ElementVector::from_column_slice(&[0.0, 0.0, 0.0, 2.0, -1.0, 0.0]);
        // Tension adds positive transverse stiffness N/L.
        let energy = sway.dot(&(k * sway));
        assert_relative_eq!(energy, 3.0e3 / 3.0 * 5.0, epsilon = 1.0e-9);
    }

    #[test]
    fn end_forces_are_self_equilibrated() {
        let geometry = diagonal_member();
        let forces = end_forces(&geometry, -250.0);
        for axis in 0..3 {
            assert_relative_eq!(forces[axis] + forces[axis + 3], 0.0, epsilon = 1.0e-12);
        }
        // Compression needs an end load pointing back toward the start node.
        assert!(forces[3] < 0.0);
    }
}
