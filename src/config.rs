//! JSON problem files.
//!
//! A problem file describes the model together with the options of every
//! stage that may run on it:
//!
//! ```json
//! {
//!   "name": "tripod",
//!   "nodes": [
//!     { "id": 1, "position": { "x": 0.0, "y": 0.0, "z": 0.0 }, "restraint": [true, true, true] }
//!   ],
//!   "members": [{ "id": 1, "start": 1, "end": 2, "elastic_modulus": 2.0e11, "area": 0.01 }],
//!   "loads": [{ "node": 2, "force": { "x": 0.0, "y": 0.0, "z": -1000.0 } }],
//!   "solver": { "mode": "nonlinear", "load_increments": 10 },
//!   "design": { "allowable_deflection": 0.02 },
//!   "optimizer": { "population_size": 20, "seed": 7 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::SolverConfig;
use crate::catalog::{SectionCatalog, TableCatalog};
use crate::constraints::DesignCriteria;
use crate::errors::{ConfigError, InputError};
use crate::geometry::{force, point, Force, Point, Restraint};
use crate::optimizer::OptimizerConfig;
use crate::truss::{MemberId, NodeId, TrussSystem};

/// A node entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Node identifier.
    pub id: NodeId,
    /// Undeformed position.
    pub position: Point,
    /// Fixed translations; free when omitted.
    #[serde(default)]
    pub restraint: Restraint,
    /// Load applied directly on the node.
    #[serde(default)]
    pub load: Force,
}

/// A member entry. Either `area` or a catalog `section` must be given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberDefinition {
    /// Member identifier.
    pub id: MemberId,
    /// Start node.
    pub start: NodeId,
    /// End node.
    pub end: NodeId,
    /// Young's modulus in Pa.
    pub elastic_modulus: f64,
    /// Cross-sectional area in m².
    #[serde(default)]
    pub area: Option<f64>,
    /// Catalog index; takes precedence over `area`.
    #[serde(default)]
    pub section: Option<usize>,
}

/// An additional nodal load; repeated entries on one node are summed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadDefinition {
    /// Loaded node.
    pub node: NodeId,
    /// Applied force in N.
    pub force: Force,
}

/// Everything needed to analyse and size one structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemDefinition {
    /// Optional title.
    #[serde(default)]
    pub name: Option<String>,
    /// Nodes.
    pub nodes: Vec<NodeDefinition>,
    /// Members.
    pub members: Vec<MemberDefinition>,
    /// Loads in addition to those given on the nodes.
    #[serde(default)]
    pub loads: Vec<LoadDefinition>,
    /// Section table; the built-in steel tube series when omitted.
    #[serde(default)]
    pub catalog: Option<TableCatalog>,
    /// Analysis options.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Design checks.
    #[serde(default)]
    pub design: DesignCriteria,
    /// Sizing options; required by the `optimize` command. Candidates are
    /// analysed with `solver` and checked against `design`.
    #[serde(default)]
    pub optimizer: Option<OptimizerConfig>,
}

impl ProblemDefinition {
    /// Read a problem file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Json`] when it is not a valid problem definition.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a problem definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialise the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The inline catalog, or the built-in steel tube series.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Analysis`] if the built-in table cannot be built.
    pub fn catalog(&self) -> Result<TableCatalog, ConfigError> {
        match &self.catalog {
            Some(catalog) => Ok(catalog.clone()),
            None => Ok(TableCatalog::steel_tubes()?),
        }
    }

    /// Sizing options of the file, analysing and checking every candidate
    /// with the file's own `solver` and `design` sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSection`] when the file has no
    /// `optimizer` section.
    pub fn optimizer_config(&self) -> Result<OptimizerConfig, ConfigError> {
        let optimizer = self
            .optimizer
            .as_ref()
            .ok_or(ConfigError::MissingSection("optimizer"))?;
        Ok(OptimizerConfig {
            solver: self.solver.clone(),
            design: self.design.clone(),
            ..optimizer.clone()
        })
    }

    /// Build the truss described by the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Analysis`] for an invalid model, including a
    /// member with neither an area nor a section.
    pub fn build_system(&self) -> Result<TrussSystem, ConfigError> {
        let catalog = self.catalog()?;
        let mut system = TrussSystem::new();
        for node in &self.nodes {
            system.add_node(node.id, node.position)?;
            system.set_restraint(node.id, node.restraint)?;
            system.add_load(node.id, node.load)?;
        }
        for load in &self.loads {
            system.add_load(load.node, load.force)?;
        }
        for member in &self.members {
            let area = match (member.section, member.area) {
                (Some(index), _) => catalog_area(&catalog, index)?,
                (None, Some(area)) => area,
                (None, None) => return Err(InputError::MissingSection(member.id).into()),
            };
            system.add_member(member.id, member.start, member.end, member.elastic_modulus, area)?;
            if let Some(index) = member.section {
                system.assign_section(member.id, &catalog, index)?;
            }
        }
        Ok(system)
    }

    /// Tetrahedral tripod benchmark: three partially restrained base nodes,
    /// one apex loaded with (0, 50 kN, −100 kN), six steel members of 0.01 m².
    #[must_use]
    pub fn tetrahedron() -> Self {
        let node = |id, position, restraint| NodeDefinition {
            id: NodeId(id),
            position,
            restraint,
            load: Force::default(),
        };
        let nodes = vec![
            node(1, point(0.0, 0.0, 0.0), Restraint::FIXED),
            node(2, point(3.0, 0.0, 0.0), Restraint::new(false, true, true)),
            node(3, point(1.5, 3.0, 0.0), Restraint::new(false, false, true)),
            node(4, point(1.5, 1.5, 4.0), Restraint::FREE),
        ];
        let members = [(1, 1, 2), (2, 2, 3), (3, 3, 1), (4, 1, 4), (5, 2, 4), (6, 3, 4)]
            .into_iter()
            .map(|(id, start, end)| MemberDefinition {
                id: MemberId(id),
                start: NodeId(start),
                end: NodeId(end),
                elastic_modulus: 2.0e11,
                area: Some(0.01),
                section: None,
            })
            .collect();
        Self {
            name: Some("tetrahedron".to_owned()),
            nodes,
            members,
            loads: vec![LoadDefinition {
                node: NodeId(4),
                force: force(0.0, 50.0e3, -100.0e3),
            }],
            catalog: None,
            solver: SolverConfig::default(),
            design: DesignCriteria::default(),
            optimizer: Some(OptimizerConfig::default()),
        }
    }
}

/// Cross-sectional area of catalog entry `index`.
fn catalog_area(catalog: &TableCatalog, index: usize) -> Result<f64, ConfigError> {
    Ok(catalog.lookup(index)?.area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnalysisError;

    const TRIPOD: &str = r#"{
        "nodes": [
            { "id": 1, "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
              "restraint": [true, true, true] },
            { "id": 2, "position": { "x": 2.0, "y": 0.0, "z": 0.0 },
              "restraint": [true, true, true] },
            { "id": 3, "position": { "x": 1.0, "y": 2.0, "z": 0.0 },
              "restraint": [true, true, true] },
            { "id": 4, "position": { "x": 1.0, "y": 0.7, "z": 2.0 },
              "load": { "x": 0.0, "y": 0.0, "z": -500.0 } }
        ],
        "members": [
            { "id": 1, "start": 1, "end": 4, "elastic_modulus": 2.0e11, "area": 0.001 },
            { "id": 2, "start": 2, "end": 4, "elastic_modulus": 2.0e11, "section": 3 },
            { "id": 3, "start": 3, "end": 4, "elastic_modulus": 2.0e11, "area": 0.001 }
        ],
        "loads": [
            { "node": 4, "force": { "x": 0.0, "y": 0.0, "z": -500.0 } }
        ],
        "solver": { "mode": "nonlinear" }
    }"#;

    #[test]
    fn problem_file_builds_system() {
        let problem = ProblemDefinition::from_json(TRIPOD).expect("valid problem");
        assert_eq!(problem.solver.load_increments, 10);
        assert!(matches!(
            problem.optimizer_config(),
            Err(ConfigError::MissingSection("optimizer"))
        ));

        let system = problem.build_system().expect("valid model");
        assert_eq!(system.node_count(), 4);
        assert_eq!(system.member_count(), 3);
        let apex = system.node(NodeId(4)).expect("apex present");
        assert_eq!(apex.load.z, -1000.0);
        let catalog = problem.catalog().expect("built-in catalog");
        let sized = system.member(MemberId(2)).expect("member present");
        assert_eq!(sized.section, Some(3));
        assert_eq!(Some(sized.area), catalog.sections().get(3).map(|section| section.area));
    }

    #[test]
    fn optimizer_uses_top_level_solver_and_design() {
        let text = TRIPOD.replace(
            r#""solver": { "mode": "nonlinear" }"#,
            r#""solver": { "mode": "nonlinear", "load_increments": 4 },
        "design": { "allowable_deflection": 0.002 },
        "optimizer": { "seed": 7, "design": { "allowable_deflection": 1.0 } }"#,
        );
        let problem = ProblemDefinition::from_json(&text).expect("valid problem");
        let config = problem.optimizer_config().expect("optimizer section present");
        assert_eq!(config.seed, 7);
        assert_eq!(config.solver, problem.solver);
        assert_eq!(config.solver.load_increments, 4);
        assert_eq!(config.design.allowable_deflection, 0.002);
    }

    #[test]
    fn member_without_area_or_section_is_rejected() {
        let mut problem = ProblemDefinition::from_json(TRIPOD).expect("valid problem");
        problem.members[0].area = None;
        let error = problem.build_system().expect_err("member 1 has no area");
        assert!(matches!(
            error,
            ConfigError::Analysis(AnalysisError::InvalidInput(InputError::MissingSection(
                MemberId(1)
            )))
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            ProblemDefinition::from_json("{ \"nodes\": 3 }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn benchmark_round_trips_through_json() {
        let problem = ProblemDefinition::tetrahedron();
        let text = problem.to_json().expect("serialisable");
        let parsed = ProblemDefinition::from_json(&text).expect("parsable");
        assert_eq!(parsed, problem);
        let system = parsed.build_system().expect("valid model");
        assert_eq!(system.restrained_dof_count(), 6);
    }
}
