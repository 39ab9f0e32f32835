//! Plain-text rendering of results for the terminal.

use spacetruss::{
    AnalysisResults, CheckKind, CheckLocation, ConstraintReport, ForceState, OptimizationReport,
    SolverStatus, Termination,
};
use std::fmt::Write;

/// Render nodal and member results as aligned text tables.
#[must_use]
pub fn render_analysis(results: &AnalysisResults) -> String {
    let mut output = String::new();

    match results.status {
        SolverStatus::Linear => output.push_str("Linear analysis\n"),
        SolverStatus::Converged {
            increments,
            iterations,
        } => {
            writeln!(
                &mut output,
                "Nonlinear analysis: {increments} increments, {iterations} iterations"
            )
            .expect("writing to string cannot fail");
        }
    }

    output.push_str("\nNode   ux [m]     uy [m]     uz [m]     Rx [N]     Ry [N]     Rz [N]\n");
    for node in &results.nodes {
        writeln!(
            &mut output,
            "{:<6} {:+.3e} {:+.3e} {:+.3e} {:+.3e} {:+.3e} {:+.3e}",
            node.id.to_string(),
            node.displacement.x,
            node.displacement.y,
            node.displacement.z,
            node.reaction.x,
            node.reaction.y,
            node.reaction.z
        )
        .expect("writing to string cannot fail");
    }

    output.push_str("\nMember      N [N]     stress [Pa]   state\n");
    for member in &results.members {
        let state = match member.state {
            ForceState::Tension => "tension",
            ForceState::Compression => "compression",
            ForceState::ZeroForce => "zero-force",
        };
        writeln!(
            &mut output,
            "{:<6} {:+.4e} {:+.4e}   {state}",
            member.id.to_string(),
            member.axial_force,
            member.stress
        )
        .expect("writing to string cannot fail");
    }

    if let Some((node, magnitude)) = results.max_displacement() {
        writeln!(&mut output, "\nMaximum displacement: {magnitude:.4e} m at {node}")
            .expect("writing to string cannot fail");
    }

    output
}

/// Render every design check, flagging those that fail.
#[must_use]
pub fn render_checks(report: &ConstraintReport) -> String {
    let mut output = String::from("\nCheck        location    demand      capacity    ratio\n");
    for check in &report.checks {
        let kind = match check.kind {
            CheckKind::Tension => "tension",
            CheckKind::Compression => "compression",
            CheckKind::Slenderness => "slenderness",
            CheckKind::Deflection => "deflection",
        };
        let location = match check.location {
            CheckLocation::Member(id) => id.to_string(),
            CheckLocation::Node(id) => id.to_string(),
        };
        let flag = if check.violation > 0.0 { "  FAIL" } else { "" };
        writeln!(
            &mut output,
            "{kind:<12} {location:<10} {:.4e}  {:.4e}  {:.3}{flag}",
            check.demand,
            check.capacity,
            check.violation + 1.0
        )
        .expect("writing to string cannot fail");
    }

    match report.governing() {
        Some(check) if report.is_satisfied() => {
            writeln!(
                &mut output,
                "All checks pass (governing ratio {:.3})",
                check.violation + 1.0
            )
            .expect("writing to string cannot fail");
        }
        Some(check) => {
            writeln!(
                &mut output,
                "Design fails: maximum violation {:+.3}",
                check.violation
            )
            .expect("writing to string cannot fail");
        }
        None => output.push_str("No checks performed\n"),
    }

    output
}

/// Render the chosen sections and the search statistics.
#[must_use]
pub fn render_optimization(report: &OptimizationReport) -> String {
    let mut output = String::new();

    let termination = match report.termination {
        Termination::Converged => "converged",
        Termination::MaxGenerations => "generation limit reached",
        Termination::Cancelled => "cancelled",
    };
    writeln!(
        &mut output,
        "Sizing {termination} after {} generations ({} evaluations)",
        report.generations, report.evaluations
    )
    .expect("writing to string cannot fail");

    output.push_str("\nGroup        index  section\n");
    for assignment in &report.assignments {
        writeln!(
            &mut output,
            "{:<12} {:>5}  {}",
            assignment.group, assignment.section, assignment.designation
        )
        .expect("writing to string cannot fail");
    }

    writeln!(&mut output, "\nTotal weight: {:.2} kg", report.total_weight)
        .expect("writing to string cannot fail");
    if report.feasible {
        output.push_str("All design checks satisfied\n");
    } else {
        writeln!(
            &mut output,
            "No feasible design found (maximum violation {:+.3}, penalty {:.3e})",
            report.max_violation.unwrap_or_default(),
            report.penalty
        )
        .expect("writing to string cannot fail");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacetruss::{
        ConstraintCheck, Displacement, Force, GroupAssignment, MemberId, MemberResult, NodeId,
        NodeResult, Point,
    };

    fn hanger_results() -> AnalysisResults {
        AnalysisResults {
            status: SolverStatus::Linear,
            nodes: vec![NodeResult {
                id: NodeId(2),
                position: Point::new(1.0, 0.0, -5.0e-7),
                displacement: Displacement::new(0.0, 0.0, -5.0e-7),
                reaction: Force::default(),
            }],
            members: vec![MemberResult {
                id: MemberId(1),
                axial_force: 1_000.0,
                stress: 1.0e5,
                length: 1.0,
                undeformed_length: 1.0,
                state: ForceState::Tension,
            }],
            increments: Vec::new(),
        }
    }

    #[test]
    fn formats_analysis_tables() {
        let report = render_analysis(&hanger_results());
        assert!(report.starts_with("Linear analysis"));
        assert!(report.contains("-5.000e-7"));
        assert!(report.contains("tension"));
        assert!(report.contains("at N2"));
    }

    #[test]
    fn flags_failing_checks() {
        let report = ConstraintReport {
            checks: vec![ConstraintCheck {
                kind: CheckKind::Compression,
                location: CheckLocation::Member(MemberId(3)),
                demand: 300.0e6,
                capacity: 200.0e6,
                violation: 0.5,
            }],
        };
        let text = render_checks(&report);
        assert!(text.contains("M3"));
        assert!(text.contains("FAIL"));
        assert!(text.contains("maximum violation +0.500"));
    }

    #[test]
    fn formats_sizing_summary() {
        let report = OptimizationReport {
            assignments: vec![GroupAssignment {
                group: "chords".to_owned(),
                section: 4,
                designation: "CHS 60.3x3.2".to_owned(),
            }],
            total_weight: 123.456,
            penalty: 0.0,
            fitness: 123.456,
            feasible: true,
            max_violation: Some(-0.2),
            generations: 12,
            evaluations: 260,
            history: Vec::new(),
            termination: Termination::Converged,
        };
        let text = render_optimization(&report);
        assert!(text.contains("converged after 12 generations"));
        assert!(text.contains("CHS 60.3x3.2"));
        assert!(text.contains("123.46 kg"));
    }
}
