use spacetruss::{
    analyze, ConstraintEvaluator, MemberGroup, MemberId, OptimizerConfig, ProblemDefinition,
    SizingOptimizer,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let problem = ProblemDefinition::tetrahedron();
    let truss = problem.build_system()?;
    let catalog = problem.catalog()?;

    // Size the base ring and the legs as two groups
    let config = OptimizerConfig {
        groups: vec![
            MemberGroup::new("base", [MemberId(1), MemberId(2), MemberId(3)]),
            MemberGroup::new("legs", [MemberId(4), MemberId(5), MemberId(6)]),
        ],
        ..OptimizerConfig::default()
    };
    let optimizer = SizingOptimizer::new(&truss, &catalog, &config)?;
    let report = optimizer.run()?;

    for assignment in &report.assignments {
        println!("{}: {}", assignment.group, assignment.designation);
    }
    println!(
        "Weight {:.2} kg after {} generations ({:?})",
        report.total_weight, report.generations, report.termination
    );

    // Re-check the chosen design
    let sized = optimizer.apply(&report.sections())?;
    let results = analyze(&sized, &config.solver)?;
    let checks = ConstraintEvaluator::new(&catalog, &config.design).evaluate(&sized, &results)?;
    if let Some(check) = checks.governing() {
        println!(
            "Governing check: {:?} at {:?}, utilisation {:.3}",
            check.kind,
            check.location,
            check.violation + 1.0
        );
    }

    Ok(())
}
