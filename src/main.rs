//! Command-line front end for analysing and sizing space trusses.

mod cli;
mod report;

use clap::Parser;
use cli::{Args, Command};
use log::info;
use report::{render_analysis, render_checks, render_optimization};
use spacetruss::{
    analyze, AnalysisMode, ConstraintEvaluator, OptimizerConfig, ProblemDefinition,
    SizingOptimizer, TrussSystem,
};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Analyze {
            file,
            nonlinear,
            increments,
            json,
        } => {
            let mut problem = load(&file)?;
            if nonlinear {
                problem.solver.mode = AnalysisMode::Nonlinear;
            }
            if let Some(increments) = increments {
                problem.solver.load_increments = increments;
            }
            run_analysis(&problem, json)
        }
        Command::Optimize {
            file,
            seed,
            generations,
            serial,
            json,
        } => {
            let problem = load(&file)?;
            let mut config = problem.optimizer_config()?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(generations) = generations {
                config.max_generations = generations;
            }
            if serial {
                config.parallel = false;
            }
            run_optimization(&problem, &config, json)
        }
        Command::Benchmark {
            nonlinear,
            optimize,
        } => {
            let mut problem = ProblemDefinition::tetrahedron();
            if nonlinear {
                problem.solver.mode = AnalysisMode::Nonlinear;
            }
            if optimize {
                let config = problem.optimizer_config()?;
                run_optimization(&problem, &config, false)
            } else {
                run_analysis(&problem, false)
            }
        }
    }
}

/// Read a problem file and log its size.
fn load(path: &Path) -> Result<ProblemDefinition, Box<dyn Error>> {
    let problem = ProblemDefinition::from_path(path)?;
    info!(
        "loaded {} ({} nodes, {} members)",
        problem.name.as_deref().unwrap_or("problem"),
        problem.nodes.len(),
        problem.members.len()
    );
    Ok(problem)
}

/// Analyse a problem, running the design checks when it is fully sized.
fn run_analysis(problem: &ProblemDefinition, json: bool) -> Result<(), Box<dyn Error>> {
    let system = problem.build_system()?;
    let results = analyze(&system, &problem.solver)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print!("{}", render_analysis(&results));
    if is_sized(&system) {
        let catalog = problem.catalog()?;
        let checks =
            ConstraintEvaluator::new(&catalog, &problem.design).evaluate(&system, &results)?;
        print!("{}", render_checks(&checks));
    }
    Ok(())
}

/// Size a problem, then re-analyse and check the chosen design.
fn run_optimization(
    problem: &ProblemDefinition,
    config: &OptimizerConfig,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let system = problem.build_system()?;
    let catalog = problem.catalog()?;
    let optimizer = SizingOptimizer::new(&system, &catalog, config)?;
    let report = optimizer.run()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", render_optimization(&report));
    let sized = optimizer.apply(&report.sections())?;
    let results = analyze(&sized, &config.solver)?;
    let checks = ConstraintEvaluator::new(&catalog, &config.design).evaluate(&sized, &results)?;
    print!("{}", render_analysis(&results));
    print!("{}", render_checks(&checks));
    Ok(())
}

/// Design checks need section properties for every member.
fn is_sized(system: &TrussSystem) -> bool {
    system.members().all(|member| member.section.is_some())
}
