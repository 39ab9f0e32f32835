//! Code-style design checks on an analysed truss.
//!
//! Every check is reduced to a normalised violation `demand / capacity − 1`:
//! zero or negative when satisfied, positive by the fraction the limit is
//! exceeded. The full vector is kept so callers can aggregate it into a
//! continuous penalty rather than a pass/fail flag.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::analysis::invalid;
use crate::catalog::SectionCatalog;
use crate::errors::{AnalysisError, InputError};
use crate::results::{AnalysisResults, ForceState};
use crate::truss::{MemberId, NodeId, TrussSystem};

/// Flexural buckling curve used to derive the compressive capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum BucklingCurve {
    /// AISC 360 column curve (E3-2 / E3-3).
    #[default]
    Aisc,
    /// Elastic Euler buckling capped at yield.
    Euler,
    /// Eurocode 3 curve with the given imperfection factor `α`.
    Eurocode {
        /// Imperfection factor, e.g. 0.21 for curve `a`.
        imperfection: f64,
    },
}

impl BucklingCurve {
    /// Critical (nominal) compressive stress at `slenderness` = KL/r.
    ///
    /// # Examples
    /// ```
    /// use spacetruss::BucklingCurve;
    ///
    /// // A stocky member reaches yield.
    /// let stress = BucklingCurve::Aisc.critical_stress(0.0, 250.0e6, 200.0e9);
    /// assert_eq!(stress, 250.0e6);
    /// ```
    #[must_use]
    pub fn critical_stress(
        self,
        slenderness: f64,
        yield_strength: f64,
        elastic_modulus: f64,
    ) -> f64 {
        let euler = PI.powi(2) * elastic_modulus / slenderness.powi(2);
        match self {
            BucklingCurve::Aisc => {
                let ratio = yield_strength / euler;
                if ratio <= 2.25 {
                    0.658_f64.powf(ratio) * yield_strength
                } else {
                    0.877 * euler
                }
            }
            BucklingCurve::Euler => euler.min(yield_strength),
            BucklingCurve::Eurocode { imperfection } => {
                let relative = (yield_strength / euler).sqrt();
                let phi = 0.5 * (1.0 + imperfection * (relative - 0.2) + relative.powi(2));
                let reduction = 1.0 / (phi + (phi.powi(2) - relative.powi(2)).sqrt());
                reduction.min(1.0) * yield_strength
            }
        }
    }
}

/// Material strength, code factors and serviceability limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignCriteria {
    /// Yield strength in Pa.
    pub yield_strength: f64,
    /// Largest admissible nodal displacement magnitude in m.
    pub allowable_deflection: f64,
    /// Column curve for compression members.
    pub buckling_curve: BucklingCurve,
    /// Effective length factor `K`.
    pub effective_length_factor: f64,
    /// Resistance factor applied to yield in tension.
    pub tension_resistance_factor: f64,
    /// Resistance factor applied to the critical stress in compression.
    pub compression_resistance_factor: f64,
    /// Slenderness limit for compression members, if any.
    pub max_compression_slenderness: Option<f64>,
    /// Slenderness limit for tension members, if any.
    pub max_tension_slenderness: Option<f64>,
}

impl Default for DesignCriteria {
    fn default() -> Self {
        Self {
            yield_strength: 250.0e6,
            allowable_deflection: 0.05,
            buckling_curve: BucklingCurve::Aisc,
            effective_length_factor: 1.0,
            tension_resistance_factor: 0.9,
            compression_resistance_factor: 0.9,
            max_compression_slenderness: Some(200.0),
            max_tension_slenderness: Some(300.0),
        }
    }
}

impl DesignCriteria {
    /// Check that every limit is positive.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<(), InputError> {
        let positive = [
            ("yield_strength", self.yield_strength),
            ("allowable_deflection", self.allowable_deflection),
            ("effective_length_factor", self.effective_length_factor),
            ("tension_resistance_factor", self.tension_resistance_factor),
            ("compression_resistance_factor", self.compression_resistance_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, "must be positive"));
            }
        }
        for (name, limit) in [
            ("max_compression_slenderness", self.max_compression_slenderness),
            ("max_tension_slenderness", self.max_tension_slenderness),
        ] {
            if limit.is_some_and(|limit| !(limit > 0.0)) {
                return Err(invalid(name, "must be positive when given"));
            }
        }
        if let BucklingCurve::Eurocode { imperfection } = self.buckling_curve {
            if !(imperfection >= 0.0) {
                return Err(invalid("imperfection", "must not be negative"));
            }
        }
        Ok(())
    }
}

/// Category of a design check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Tensile stress against factored yield.
    Tension,
    /// Compressive stress against the factored buckling stress.
    Compression,
    /// KL/r against the slenderness limit.
    Slenderness,
    /// Maximum displacement magnitude against the allowable deflection.
    Deflection,
}

/// Element of the structure a check refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckLocation {
    /// A member check.
    Member(MemberId),
    /// A nodal check.
    Node(NodeId),
}

/// Outcome of one design check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintCheck {
    /// What was checked.
    pub kind: CheckKind,
    /// Where it was checked.
    pub location: CheckLocation,
    /// Demand (stress, slenderness or displacement).
    pub demand: f64,
    /// Capacity in the same units as `demand`.
    pub capacity: f64,
    /// `demand / capacity − 1`; positive when the limit is exceeded.
    pub violation: f64,
}

impl ConstraintCheck {
    /// Check with its violation derived from `demand` and `capacity`.
    fn new(kind: CheckKind, location: CheckLocation, demand: f64, capacity: f64) -> Self {
        let violation = if capacity > 0.0 {
            demand / capacity - 1.0
        } else {
            f64::INFINITY
        };
        Self {
            kind,
            location,
            demand,
            capacity,
            violation,
        }
    }
}

/// Every check performed on one design.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    /// Checks in member order, followed by the deflection check.
    pub checks: Vec<ConstraintCheck>,
}

impl ConstraintReport {
    /// The violation vector.
    #[must_use]
    pub fn violations(&self) -> Vec<f64> {
        self.checks.iter().map(|check| check.violation).collect()
    }

    /// Largest violation, if any check was performed.
    #[must_use]
    pub fn max_violation(&self) -> Option<f64> {
        self.checks
            .iter()
            .map(|check| check.violation)
            .reduce(f64::max)
    }

    /// Check with the largest violation.
    #[must_use]
    pub fn governing(&self) -> Option<&ConstraintCheck> {
        self.checks
            .iter()
            .max_by(|a, b| a.violation.total_cmp(&b.violation))
    }

    /// True when no check is violated.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.checks.iter().all(|check| check.violation <= 0.0)
    }

    /// Quadratic penalty `scale · Σ max(0, v)²`.
    #[must_use]
    pub fn penalty(&self, scale: f64) -> f64 {
        scale
            * self
                .checks
                .iter()
                .map(|check| check.violation.max(0.0).powi(2))
                .sum::<f64>()
    }
}

/// Evaluates strength, stability and deflection limits against a catalog.
pub struct ConstraintEvaluator<'a, C: SectionCatalog + ?Sized> {
    /// Source of section properties.
    catalog: &'a C,
    /// Limits and resistance factors.
    criteria: &'a DesignCriteria,
}

impl<'a, C: SectionCatalog + ?Sized> ConstraintEvaluator<'a, C> {
    /// Evaluator reading sections from `catalog`.
    pub fn new(catalog: &'a C, criteria: &'a DesignCriteria) -> Self {
        Self { catalog, criteria }
    }

    /// Run every check on `results`, which must come from analysing `system`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::MissingSection`] when a member has no catalog
    /// section, and [`AnalysisError::CatalogLookup`] when its index is out of
    /// range.
    pub fn evaluate(
        &self,
        system: &TrussSystem,
        results: &AnalysisResults,
    ) -> Result<ConstraintReport, AnalysisError> {
        let criteria = self.criteria;
        let mut checks = Vec::with_capacity(2 * system.member_count() + 1);
        for (member, result) in system.members().zip(&results.members) {
            if member.id != result.id {
                return Err(InputError::UnknownMember(result.id).into());
            }
            let index = member.section.ok_or(InputError::MissingSection(member.id))?;
            let section = self.catalog.lookup(index)?;
            let location = CheckLocation::Member(member.id);
            let stress = result.axial_force / section.area;
            let slenderness = criteria.effective_length_factor * result.undeformed_length
                / section.radius_of_gyration;

            let slenderness_limit = if result.state == ForceState::Compression {
                let critical = criteria.buckling_curve.critical_stress(
                    slenderness,
                    criteria.yield_strength,
                    member.elastic_modulus,
                );
                checks.push(ConstraintCheck::new(
                    CheckKind::Compression,
                    location,
                    -stress,
                    criteria.compression_resistance_factor * critical,
                ));
                criteria.max_compression_slenderness
            } else {
                checks.push(ConstraintCheck::new(
                    CheckKind::Tension,
                    location,
                    stress.max(0.0),
                    criteria.tension_resistance_factor * criteria.yield_strength,
                ));
                criteria.max_tension_slenderness
            };
            if let Some(limit) = slenderness_limit {
                checks.push(ConstraintCheck::new(
                    CheckKind::Slenderness,
                    location,
                    slenderness,
                    limit,
                ));
            }
        }

        if let Some((node, magnitude)) = results.max_displacement() {
            checks.push(ConstraintCheck::new(
                CheckKind::Deflection,
                CheckLocation::Node(node),
                magnitude,
                criteria.allowable_deflection,
            ));
        }
        Ok(ConstraintReport { checks })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::analysis::{analyze, SolverConfig};
    use crate::catalog::{SectionProperties, TableCatalog};
    use crate::geometry::{force, point, Restraint};

    fn catalog() -> TableCatalog {
        TableCatalog::new(vec![
            SectionProperties::new("small", 1.0e-4, 0.005, 0.785),
            SectionProperties::new("large", 2.0e-3, 0.04, 15.7),
        ])
        .expect("valid catalog")
    }

    /// Horizontal bar of length `length` with an axial end load.
    fn bar(length: f64, load: f64, section: usize) -> TrussSystem {
        let mut truss = TrussSystem::new();
        truss
            .add_node(NodeId(1), point(0.0, 0.0, 0.0))
            .expect("node added");
        truss
            .add_node(NodeId(2), point(length, 0.0, 0.0))
            .expect("node added");
        truss
            .set_restraint(NodeId(1), Restraint::FIXED)
            .expect("restraint applied");
        truss
            .set_restraint(NodeId(2), Restraint::new(false, true, true))
            .expect("restraint applied");
        truss
            .add_load(NodeId(2), force(load, 0.0, 0.0))
            .expect("load applied");
        truss
            .add_member(MemberId(1), NodeId(1), NodeId(2), 200.0e9, 1.0e-4)
            .expect("member added");
        truss
            .assign_section(MemberId(1), &catalog(), section)
            .expect("section assigned");
        truss
    }

    fn report(truss: &TrussSystem) -> ConstraintReport {
        let results = analyze(truss, &SolverConfig::linear()).expect("analysis succeeds");
        let catalog = catalog();
        let criteria = DesignCriteria::default();
        ConstraintEvaluator::new(&catalog, &criteria)
            .evaluate(truss, &results)
            .expect("evaluation succeeds")
    }

    #[test]
    fn lightly_loaded_member_satisfies_all_checks() {
        let report = report(&bar(1.0, 10.0e3, 1));
        assert!(report.is_satisfied());
        assert!(report.violations().iter().all(|violation| *violation <= 0.0));
        assert_eq!(report.penalty(1.0e6), 0.0);
        let tension = report.checks[0];
        assert_eq!(tension.kind, CheckKind::Tension);
        assert_relative_eq!(tension.demand, 10.0e3 / 2.0e-3, max_relative = 1.0e-9);
    }

    #[test]
    fn overstressed_member_violates_tension() {
        // 30 kN on 1 cm² is 300 MPa against 225 MPa factored yield.
        let report = report(&bar(1.0, 30.0e3, 0));
        let tension = report.checks[0];
        assert_eq!(tension.kind, CheckKind::Tension);
        assert_relative_eq!(tension.violation, 300.0 / 225.0 - 1.0, max_relative = 1.0e-9);
        assert!(!report.is_satisfied());
        assert!(report.penalty(1.0) > 0.0);
    }

    #[test]
    fn slender_strut_violates_buckling_and_slenderness() {
        // KL/r = 2 m / 5 mm = 400.
        let report = report(&bar(2.0, -5.0e3, 0));
        let kinds: Vec<CheckKind> = report
            .checks
            .iter()
            .filter(|check| check.violation > 0.0)
            .map(|check| check.kind)
            .collect();
        assert!(kinds.contains(&CheckKind::Compression));
        assert!(kinds.contains(&CheckKind::Slenderness));
        let governing = report.governing().expect("checks present");
        assert_eq!(report.max_violation(), Some(governing.violation));
    }

    #[test]
    fn excessive_deflection_is_reported() {
        let truss = bar(1.0, 10.0e3, 1);
        let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");
        // The tip moves 25 µm.
        let criteria = DesignCriteria {
            allowable_deflection: 1.0e-6,
            ..DesignCriteria::default()
        };
        let catalog = catalog();
        let report = ConstraintEvaluator::new(&catalog, &criteria)
            .evaluate(&truss, &results)
            .expect("evaluation succeeds");
        let deflection = report.checks.last().expect("deflection check");
        assert_eq!(deflection.kind, CheckKind::Deflection);
        assert_eq!(deflection.location, CheckLocation::Node(NodeId(2)));
        assert!(deflection.violation > 0.0);
    }

    #[test]
    fn member_without_section_is_rejected() {
        let mut truss = bar(1.0, 10.0e3, 1);
        truss
            .set_member_area(MemberId(1), 2.0e-3)
            .expect("area updated");
        let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");
        let catalog = catalog();
        let criteria = DesignCriteria::default();
        let error = ConstraintEvaluator::new(&catalog, &criteria)
            .evaluate(&truss, &results)
            .expect_err("section required");
        assert_eq!(
            error,
            AnalysisError::InvalidInput(InputError::MissingSection(MemberId(1)))
        );
    }

    #[test]
    fn aisc_curve_is_nearly_continuous_at_transition() {
        let (fy, e): (f64, f64) = (250.0e6, 200.0e9);
        let transition = PI * (2.25 * e / fy).sqrt();
        let below = BucklingCurve::Aisc.critical_stress(transition * (1.0 - 1.0e-9), fy, e);
        let above = BucklingCurve::Aisc.critical_stress(transition * (1.0 + 1.0e-9), fy, e);
        assert_relative_eq!(below, above, max_relative = 1.0e-3);
    }

    #[test]
    fn eurocode_curve_has_plateau_and_euler_limit() {
        let (fy, e): (f64, f64) = (355.0e6, 210.0e9);
        let curve = BucklingCurve::Eurocode { imperfection: 0.21 };
        let plateau = 0.2 * PI * (e / fy).sqrt();
        assert_relative_eq!(curve.critical_stress(plateau, fy, e), fy, max_relative = 1.0e-12);
        let slender = curve.critical_stress(300.0, fy, e);
        let euler = BucklingCurve::Euler.critical_stress(300.0, fy, e);
        assert!(slender < euler);
    }

    #[test]
    fn criteria_deserialize_with_tagged_curve() {
        let criteria: DesignCriteria = serde_json::from_str(
            r#"{
                "yield_strength": 355e6,
                "buckling_curve": { "curve": "eurocode", "imperfection": 0.34 }
            }"#,
        )
        .expect("valid criteria");
        assert_eq!(criteria.buckling_curve, BucklingCurve::Eurocode { imperfection: 0.34 });
        assert_eq!(criteria.allowable_deflection, 0.05);
        assert!(criteria.validate().is_ok());
    }
}
