#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod analysis;
mod assembly;
mod catalog;
mod config;
mod constraints;
mod element;
mod errors;
mod geometry;
mod linear;
mod nonlinear;
mod optimizer;
mod results;
mod truss;

pub use analysis::{analyze, AnalysisMode, ConvergenceNorm, SolverConfig};
pub use assembly::{
    assemble_loads, assemble_stiffness, assemble_tangent, member_end_displacements, DofMap,
    TangentSystem,
};
pub use catalog::{SectionCatalog, SectionProperties, TableCatalog, STEEL_DENSITY};
pub use config::{LoadDefinition, MemberDefinition, NodeDefinition, ProblemDefinition};
pub use constraints::{
    BucklingCurve, CheckKind, CheckLocation, ConstraintCheck, ConstraintEvaluator,
    ConstraintReport, DesignCriteria,
};
pub use element::{
    elastic_stiffness, end_forces, geometric_stiffness, ElementMatrix, ElementVector,
    MemberGeometry, MIN_MEMBER_LENGTH,
};
pub use errors::{AnalysisError, CatalogError, ConfigError, InputError};
pub use geometry::{force, point, Displacement, Force, Point, Restraint};
pub use linear::{partition, partition_vector, solve_free, solve_linear, Factorization};
pub use nonlinear::{solve_nonlinear, NewtonRaphson, SolverPhase};
pub use optimizer::{
    CancellationToken, GenerationRecord, GroupAssignment, Initialization, MemberGroup, Mutation,
    OptimizationReport, OptimizerConfig, SizingOptimizer, Strategy, Termination,
};
pub use results::{
    AnalysisResults, ForceState, IncrementRecord, MemberResult, NodeResult, SolverStatus,
};
pub use truss::{Member, MemberId, Node, NodeId, TrussSystem};
