//! Core data model for pin-jointed space trusses.
//!
//! A [`TrussSystem`] is plain data: nodes, members, restraints and loads held
//! in a graph. It never solves itself; the assembler and solvers borrow it and
//! return their results as separate values.

use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::catalog::SectionCatalog;
use crate::element::{MemberGeometry, MIN_MEMBER_LENGTH};
use crate::errors::{AnalysisError, InputError};
use crate::geometry::{Force, Point, Restraint};

/// User-facing identifier of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// User-facing identifier of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A joint of the truss.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Identifier supplied by the caller.
    pub id: NodeId,
    /// Undeformed position in metres.
    pub position: Point,
    /// Fixed translational degrees of freedom.
    pub restraint: Restraint,
    /// External load applied to the joint in newtons.
    pub load: Force,
}

/// An axial bar connecting two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// Identifier supplied by the caller.
    pub id: MemberId,
    /// Node at the start of the member.
    pub start: NodeId,
    /// Node at the end of the member.
    pub end: NodeId,
    /// Elastic modulus in pascals.
    pub elastic_modulus: f64,
    /// Cross-sectional area in square metres.
    pub area: f64,
    /// Catalog index of the assigned section, when sized from a catalog.
    pub section: Option<usize>,
}

impl Member {
    /// Axial rigidity `EA` in newtons.
    #[must_use]
    pub fn axial_rigidity(&self) -> f64 {
        self.elastic_modulus * self.area
    }
}

/// Container for a pin-jointed space truss.
///
/// Degrees of freedom are numbered three per node in insertion order, so the
/// numbering stays stable for as long as the system is alive.
#[derive(Clone, Debug, Default)]
pub struct TrussSystem {
    /// Underlying graph storage for nodes and members.
    graph: Graph<Node, Member>,
    /// Lookup from node identifier to graph index.
    node_lookup: HashMap<NodeId, NodeIndex>,
    /// Lookup from member identifier to graph index.
    member_lookup: HashMap<MemberId, EdgeIndex>,
}

impl TrussSystem {
    /// Create an empty truss.
    ///
    /// # Examples
    /// ```
    /// use spacetruss::TrussSystem;
    ///
    /// let truss = TrussSystem::new();
    /// assert_eq!(truss.node_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nodes in the truss.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of members in the truss.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a new free, unloaded node to the truss.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::DuplicateNode`] when `id` is already used and
    /// [`InputError::NonFiniteNode`] when a coordinate is NaN or infinite.
    ///
    /// # Examples
    /// ```
    /// use spacetruss::{point, NodeId, TrussSystem};
    ///
    /// let mut truss = TrussSystem::new();
    /// truss.add_node(NodeId(1), point(0.0, 0.0, 0.0)).expect("new node");
    /// assert!(truss.add_node(NodeId(1), point(1.0, 0.0, 0.0)).is_err());
    /// ```
    pub fn add_node(&mut self, id: NodeId, position: Point) -> Result<NodeIndex, InputError> {
        if self.node_lookup.contains_key(&id) {
            return Err(InputError::DuplicateNode(id));
        }
        if !position.is_finite() {
            return Err(InputError::NonFiniteNode(id));
        }
        let index = self.graph.add_node(Node {
            id,
            position,
            restraint: Restraint::FREE,
            load: Force::default(),
        });
        self.node_lookup.insert(id, index);
        Ok(index)
    }

    /// Set the restraint state for a node.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownNode`] when `id` is not part of this truss.
    pub fn set_restraint(&mut self, id: NodeId, restraint: Restraint) -> Result<(), InputError> {
        self.node_mut(id)?.restraint = restraint;
        Ok(())
    }

    /// Replace the load applied to a node.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownNode`] when `id` is not part of this truss.
    pub fn set_load(&mut self, id: NodeId, load: Force) -> Result<(), InputError> {
        Self::check_load(id, load)?;
        self.node_mut(id)?.load = load;
        Ok(())
    }

    /// Add `load` to whatever load the node already carries.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownNode`] when `id` is not part of this truss.
    pub fn add_load(&mut self, id: NodeId, load: Force) -> Result<(), InputError> {
        Self::check_load(id, load)?;
        let node = self.node_mut(id)?;
        node.load = node.load + load;
        Ok(())
    }

    /// Connect two existing nodes with a new member.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] for a duplicate identifier, a dangling node
    /// reference, a member connecting a node to itself or non-positive
    /// properties.
    pub fn add_member(
        &mut self,
        id: MemberId,
        start: NodeId,
        end: NodeId,
        elastic_modulus: f64,
        area: f64,
    ) -> Result<EdgeIndex, InputError> {
        if self.member_lookup.contains_key(&id) {
            return Err(InputError::DuplicateMember(id));
        }
        let start_index = self.node_index(start).ok_or(InputError::UnknownNode(start))?;
        let end_index = self.node_index(end).ok_or(InputError::UnknownNode(end))?;
        if start == end {
            return Err(InputError::SelfConnectedMember {
                member: id,
                node: start,
            });
        }
        check_properties(id, elastic_modulus, area)?;
        let edge = self.graph.add_edge(
            start_index,
            end_index,
            Member {
                id,
                start,
                end,
                elastic_modulus,
                area,
                section: None,
            },
        );
        self.member_lookup.insert(id, edge);
        Ok(edge)
    }

    /// Set the cross-sectional area of a member directly.
    ///
    /// Any catalog reference on the member is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownMember`] when `id` is not part of this truss
    /// and [`InputError::NonPositiveArea`] for a non-positive area.
    pub fn set_member_area(&mut self, id: MemberId, area: f64) -> Result<(), InputError> {
        let member = self.member_mut(id)?;
        check_properties(id, member.elastic_modulus, area)?;
        member.area = area;
        member.section = None;
        Ok(())
    }

    /// Assign catalog section `index` to a member, taking its area from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::CatalogLookup`] when the index is out of range
    /// and [`AnalysisError::InvalidInput`] when the member does not exist.
    pub fn assign_section<C: SectionCatalog + ?Sized>(
        &mut self,
        id: MemberId,
        catalog: &C,
        index: usize,
    ) -> Result<(), AnalysisError> {
        let area = catalog.lookup(index)?.area;
        let member = self.member_mut(id)?;
        check_properties(id, member.elastic_modulus, area)?;
        member.area = area;
        member.section = Some(index);
        Ok(())
    }

    /// Look up a node by identifier.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index(id).map(|index| &self.graph[index])
    }

    /// Look up a member by identifier.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.member_lookup.get(&id).map(|edge| &self.graph[*edge])
    }

    /// Iterate over nodes in degree-of-freedom order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Iterate over members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.graph.edge_weights()
    }

    /// Iterate over members together with the dense indices of their end nodes.
    pub(crate) fn member_endpoints(&self) -> impl Iterator<Item = (&Member, usize, usize)> {
        self.graph.edge_indices().filter_map(move |edge| {
            let (start, end) = self.graph.edge_endpoints(edge)?;
            Some((&self.graph[edge], start.index(), end.index()))
        })
    }

    /// Dense index of a node, equal to its position in [`TrussSystem::nodes`].
    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_lookup.get(&id).copied()
    }

    /// Undeformed node positions in degree-of-freedom order.
    #[must_use]
    pub fn positions(&self) -> Vec<Point> {
        self.nodes().map(|node| node.position).collect()
    }

    /// Undeformed geometry of a member.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for an unknown member and
    /// [`AnalysisError::DegenerateGeometry`] for a zero-length member.
    pub fn member_geometry(&self, id: MemberId) -> Result<MemberGeometry, AnalysisError> {
        let member = self.member(id).ok_or(InputError::UnknownMember(id))?;
        let start = self.node(member.start).ok_or(InputError::UnknownNode(member.start))?;
        let end = self.node(member.end).ok_or(InputError::UnknownNode(member.end))?;
        MemberGeometry::between(id, start.position, end.position)
    }

    /// Number of restrained degrees of freedom.
    #[must_use]
    pub fn restrained_dof_count(&self) -> usize {
        self.nodes().map(|node| node.restraint.fixed_count()).sum()
    }

    /// Number of free degrees of freedom, `3 × nodes − restrained`.
    #[must_use]
    pub fn free_dof_count(&self) -> usize {
        3 * self.node_count() - self.restrained_dof_count()
    }

    /// Check the model before any matrix is assembled.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::EmptyModel`] for a truss without members and
    /// [`InputError::ZeroLengthMember`] when two connected nodes coincide.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.node_count() < 2 || self.member_count() == 0 {
            return Err(InputError::EmptyModel);
        }
        for (member, start, end) in self.member_endpoints() {
            let delta = self.graph[NodeIndex::new(end)].position.to_vector()
                - self.graph[NodeIndex::new(start)].position.to_vector();
            if delta.norm() <= MIN_MEMBER_LENGTH {
                return Err(InputError::ZeroLengthMember(member.id));
            }
            check_properties(member.id, member.elastic_modulus, member.area)?;
        }
        Ok(())
    }

    /// Reject models whose restraints cannot suppress the six rigid-body modes.
    ///
    /// This is a counting check only; a restraint layout that passes can still
    /// produce a singular stiffness matrix.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InsufficientRestraints`] when fewer than six
    /// degrees of freedom are restrained.
    pub fn check_restraints(&self) -> Result<(), InputError> {
        let restrained = self.restrained_dof_count();
        if restrained < 6 {
            return Err(InputError::InsufficientRestraints { restrained });
        }
        Ok(())
    }

    /// Mutable access to a node by identifier.
    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, InputError> {
        let index = self.node_index(id).ok_or(InputError::UnknownNode(id))?;
        Ok(&mut self.graph[index])
    }

    /// Mutable access to a member by identifier.
    fn member_mut(&mut self, id: MemberId) -> Result<&mut Member, InputError> {
        let edge = *self
            .member_lookup
            .get(&id)
            .ok_or(InputError::UnknownMember(id))?;
        Ok(&mut self.graph[edge])
    }

    /// Reject NaN or infinite load components.
    fn check_load(id: NodeId, load: Force) -> Result<(), InputError> {
        if load.x.is_finite() && load.y.is_finite() && load.z.is_finite() {
            Ok(())
        } else {
            Err(InputError::NonFiniteNode(id))
        }
    }
}

/// Validate the axial properties of a member.
fn check_properties(member: MemberId, elastic_modulus: f64, area: f64) -> Result<(), InputError> {
    if !(area > 0.0 && area.is_finite()) {
        return Err(InputError::NonPositiveArea { member, area });
    }
    if !(elastic_modulus > 0.0 && elastic_modulus.is_finite()) {
        return Err(InputError::NonPositiveElasticModulus {
            member,
            elastic_modulus,
        });
    }
    Ok(())
}
