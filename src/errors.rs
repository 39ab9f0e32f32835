//! Error types produced while building, analysing or sizing trusses.

use thiserror::Error;

use crate::truss::{MemberId, NodeId};

/// Error returned when a model, group definition or configuration is malformed.
///
/// These are detected before any matrix is assembled so callers get a precise
/// pointer to the offending node or member.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InputError {
    /// Two nodes share the same identifier.
    #[error("node {0} is defined more than once")]
    DuplicateNode(NodeId),
    /// Two members share the same identifier.
    #[error("member {0} is defined more than once")]
    DuplicateMember(MemberId),
    /// A reference points at a node that does not exist.
    #[error("node {0} does not exist in this truss")]
    UnknownNode(NodeId),
    /// A reference points at a member that does not exist.
    #[error("member {0} does not exist in this truss")]
    UnknownMember(MemberId),
    /// A member connects a node to itself.
    #[error("member {member} connects node {node} to itself")]
    SelfConnectedMember {
        /// Identifier of the offending member.
        member: MemberId,
        /// Node referenced at both ends.
        node: NodeId,
    },
    /// The two end nodes of a member coincide.
    #[error("member {0} has zero length")]
    ZeroLengthMember(MemberId),
    /// The cross-sectional area is zero, negative or not finite.
    #[error("member {member} area must be positive (received {area})")]
    NonPositiveArea {
        /// Identifier of the affected member.
        member: MemberId,
        /// Rejected cross-sectional area in square metres.
        area: f64,
    },
    /// The elastic modulus is zero, negative or not finite.
    #[error("member {member} elastic modulus must be positive (received {elastic_modulus})")]
    NonPositiveElasticModulus {
        /// Identifier of the affected member.
        member: MemberId,
        /// Rejected elastic modulus in pascals.
        elastic_modulus: f64,
    },
    /// A coordinate or load component is NaN or infinite.
    #[error("node {0} has a non-finite coordinate or load")]
    NonFiniteNode(NodeId),
    /// A design check needs catalog properties the member does not carry.
    #[error("member {0} has no catalog section assigned")]
    MissingSection(MemberId),
    /// Too few restrained degrees of freedom to suppress rigid-body motion.
    #[error("only {restrained} degrees of freedom are restrained; at least 6 are required")]
    InsufficientRestraints {
        /// Number of restrained degrees of freedom in the model.
        restrained: usize,
    },
    /// The model has no members to analyse.
    #[error("the truss must contain at least two nodes and one member")]
    EmptyModel,
    /// A member does not belong to any sizing group.
    #[error("member {0} is not assigned to any member group")]
    UngroupedMember(MemberId),
    /// A member appears in more than one sizing group.
    #[error("member {0} belongs to more than one member group")]
    DuplicateGroupMember(MemberId),
    /// A numeric parameter is outside its admissible range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Explanation of the admissible range.
        reason: String,
    },
}

/// Error returned by a [`SectionCatalog`](crate::SectionCatalog) lookup.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CatalogError {
    /// The requested index is past the end of the catalog.
    #[error("section index {index} is out of range for a catalog of {size} sections")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of sections available.
        size: usize,
    },
    /// The catalog holds no sections.
    #[error("the section catalog is empty")]
    EmptyCatalog,
    /// A catalog entry carries non-physical properties.
    #[error("section `{designation}` has invalid properties: {reason}")]
    InvalidSection {
        /// Designation of the entry.
        designation: String,
        /// Description of the problem.
        reason: String,
    },
}

/// Error returned when a truss analysis fails.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// The model failed validation before any solve was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    /// A member collapsed to (near) zero length in the current geometry.
    #[error("member {member} has degenerate geometry (length {length:e})")]
    DegenerateGeometry {
        /// Identifier of the member.
        member: MemberId,
        /// Computed length in metres.
        length: f64,
    },
    /// The reduced stiffness matrix is singular or numerically near-singular.
    #[error(
        "stiffness matrix is singular near node {node} axis {axis} \
         (pivot ratio {pivot_ratio:e}); check supports and connectivity"
    )]
    SingularStiffness {
        /// Node owning the degree of freedom with the weakest pivot.
        node: NodeId,
        /// Axis of that degree of freedom (0 = X, 1 = Y, 2 = Z).
        axis: usize,
        /// Smallest pivot divided by the largest pivot.
        pivot_ratio: f64,
    },
    /// Newton-Raphson did not reach equilibrium within the iteration budget.
    #[error(
        "load increment {increment} did not converge after {iterations} iterations \
         (residual {residual:e})"
    )]
    NonConvergence {
        /// One-based index of the failing load increment.
        increment: usize,
        /// Iterations performed in that increment.
        iterations: usize,
        /// Last residual measure.
        residual: f64,
    },
    /// A section index could not be resolved.
    #[error("catalog lookup failed: {0}")]
    CatalogLookup(#[from] CatalogError),
}

/// Error returned while loading a problem file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for a problem definition.
    #[error("malformed problem file: {0}")]
    Json(#[from] serde_json::Error),
    /// The definition does not describe a valid model.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// The file has no optimizer section but one was requested.
    #[error("problem file has no `{0}` section")]
    MissingSection(&'static str),
}

impl From<InputError> for ConfigError {
    fn from(value: InputError) -> Self {
        ConfigError::Analysis(value.into())
    }
}

impl From<CatalogError> for ConfigError {
    fn from(value: CatalogError) -> Self {
        ConfigError::Analysis(value.into())
    }
}
