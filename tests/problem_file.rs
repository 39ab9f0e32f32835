use spacetruss::{
    analyze, AnalysisMode, ConstraintEvaluator, ProblemDefinition, SizingOptimizer,
};

fn demo_problem() -> ProblemDefinition {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/tetrahedron.json");
    ProblemDefinition::from_path(path).expect("demo problem file loads")
}

#[test]
fn sizing_follows_file_solver_and_design() {
    let problem = demo_problem();
    let config = problem
        .optimizer_config()
        .expect("demo file has an optimizer section");

    assert_eq!(problem.solver.mode, AnalysisMode::Nonlinear);
    assert_eq!(config.solver, problem.solver);
    assert_eq!(config.design, problem.design);
    assert_eq!(config.design.allowable_deflection, 0.02);
    assert_eq!(config.groups.len(), 2);
}

#[test]
fn sized_design_is_judged_against_file_criteria() {
    let mut problem = demo_problem();
    problem.design.allowable_deflection = 0.002;
    let mut config = problem
        .optimizer_config()
        .expect("demo file has an optimizer section");
    config.population_size = 10;
    config.max_generations = 8;

    let system = problem.build_system().expect("demo model is valid");
    let catalog = problem.catalog().expect("built-in catalog is valid");
    let optimizer = SizingOptimizer::new(&system, &catalog, &config).expect("valid setup");
    let report = optimizer.run().expect("search completes");

    let sized = optimizer.apply(&report.sections()).expect("valid sections");
    let results = analyze(&sized, &problem.solver).expect("analysis converges");
    let checks = ConstraintEvaluator::new(&catalog, &problem.design)
        .evaluate(&sized, &results)
        .expect("every member has a section");
    assert_eq!(report.feasible, checks.is_satisfied());
    if report.feasible {
        let (_, deflection) = results
            .max_displacement()
            .expect("nodes have results");
        assert!(deflection <= 0.002);
    }
}
