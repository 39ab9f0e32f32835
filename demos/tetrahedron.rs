use spacetruss::{analyze, ProblemDefinition, SolverConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Tripod with a partially restrained base and a loaded apex
    let problem = ProblemDefinition::tetrahedron();
    let truss = problem.build_system()?;

    // First-order solution
    let linear = analyze(&truss, &SolverConfig::linear())?;

    // Large-displacement solution in ten load steps
    let nonlinear = analyze(&truss, &SolverConfig::nonlinear(10))?;

    for (small, large) in linear.members.iter().zip(&nonlinear.members) {
        println!(
            "{}: N = {:+.4e} N (linear), {:+.4e} N (nonlinear)",
            small.id, small.axial_force, large.axial_force
        );
    }
    if let Some((node, magnitude)) = nonlinear.max_displacement() {
        println!("Largest displacement: {magnitude:.3e} m at {node}");
    }
    println!("Newton-Raphson iterations: {}", nonlinear.iterations());

    Ok(())
}
