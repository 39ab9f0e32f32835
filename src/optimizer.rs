//! Discrete member sizing by differential evolution.
//!
//! Each member group carries one real-valued gene that is rounded onto a
//! catalog index before the design is analysed. Fitness is the structural
//! weight plus a quadratic penalty on the constraint violations, so the search
//! itself is continuous while every evaluated structure is discrete.
//!
//! Trial vectors are generated sequentially from a seeded [`StdRng`] and then
//! evaluated as a batch (in parallel with rayon when enabled); selection runs
//! only after the whole batch is scored. The decision sequence therefore
//! depends on the seed alone, not on thread scheduling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{analyze, invalid, SolverConfig};
use crate::catalog::SectionCatalog;
use crate::constraints::{ConstraintEvaluator, DesignCriteria};
use crate::errors::{AnalysisError, CatalogError, InputError};
use crate::truss::{MemberId, TrussSystem};

/// Members that share one section choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberGroup {
    /// Label used in reports.
    pub name: String,
    /// Members of the group.
    pub members: Vec<MemberId>,
}

impl MemberGroup {
    /// Group `members` under `name`.
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }
}

/// Differential weight `F` applied to difference vectors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// The same factor in every generation.
    Constant {
        /// Differential weight.
        factor: f64,
    },
    /// A factor drawn uniformly from `[low, high)` once per generation.
    Dither {
        /// Lower end of the range.
        low: f64,
        /// Upper end of the range.
        high: f64,
    },
}

impl Default for Mutation {
    fn default() -> Self {
        Mutation::Dither { low: 0.5, high: 1.0 }
    }
}

impl Mutation {
    /// Differential weight for one generation.
    fn sample(self, rng: &mut StdRng) -> f64 {
        match self {
            Mutation::Constant { factor } => factor,
            Mutation::Dither { low, high } => rng.gen_range(low..high),
        }
    }
}

/// Base vector and difference count used to build mutants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// `best + F·(r₀ − r₁)` with binomial crossover.
    #[default]
    #[serde(rename = "best1bin")]
    Best1Bin,
    /// `r₀ + F·(r₁ − r₂)` with binomial crossover.
    #[serde(rename = "rand1bin")]
    Rand1Bin,
}

/// How the initial population is spread over the bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    /// One sample per stratum in every dimension.
    #[default]
    LatinHypercube,
    /// Independent uniform samples.
    Random,
}

/// Options of a sizing run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Member groups; an empty list sizes every member on its own.
    pub groups: Vec<MemberGroup>,
    /// Number of candidate vectors per generation.
    pub population_size: usize,
    /// Differential weight.
    pub mutation: Mutation,
    /// Crossover probability.
    pub crossover: f64,
    /// Mutation strategy.
    pub strategy: Strategy,
    /// Initial population layout.
    pub initialization: Initialization,
    /// Gene bounds per group; defaults to the whole catalog.
    pub bounds: Option<Vec<(f64, f64)>>,
    /// Generation budget.
    pub max_generations: usize,
    /// Relative tolerance on the spread of population fitness.
    pub tolerance: f64,
    /// Absolute tolerance on the spread of population fitness.
    pub absolute_tolerance: f64,
    /// Multiplier of the summed squared violations.
    pub penalty_scale: f64,
    /// Fitness assigned to designs whose analysis fails.
    pub failure_penalty: f64,
    /// Random seed.
    pub seed: u64,
    /// Evaluate each generation on the rayon thread pool.
    pub parallel: bool,
    /// Analysis used for every evaluation; problem files supply their
    /// top-level `solver` section.
    #[serde(skip)]
    pub solver: SolverConfig,
    /// Design checks used for every evaluation; problem files supply their
    /// top-level `design` section.
    #[serde(skip)]
    pub design: DesignCriteria,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            population_size: 20,
            mutation: Mutation::default(),
            crossover: 0.7,
            strategy: Strategy::Best1Bin,
            initialization: Initialization::LatinHypercube,
            bounds: None,
            max_generations: 100,
            tolerance: 0.01,
            absolute_tolerance: 0.0,
            penalty_scale: 1.0e6,
            failure_penalty: 1.0e12,
            seed: 2024,
            parallel: true,
            solver: SolverConfig::default(),
            design: DesignCriteria::default(),
        }
    }
}

impl OptimizerConfig {
    /// Check the numeric options.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidParameter`] naming the first bad option.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.population_size < 4 {
            return Err(invalid("population_size", "must be at least 4"));
        }
        match self.mutation {
            Mutation::Constant { factor } if !(factor > 0.0 && factor <= 2.0) => {
                return Err(invalid("mutation", "factor must lie in (0, 2]"));
            }
            Mutation::Dither { low, high } if !(low >= 0.0 && low < high && high <= 2.0) => {
                return Err(invalid("mutation", "dither range must satisfy 0 <= low < high <= 2"));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.crossover) {
            return Err(invalid("crossover", "must lie in [0, 1]"));
        }
        if !(self.tolerance >= 0.0 && self.absolute_tolerance >= 0.0) {
            return Err(invalid("tolerance", "must not be negative"));
        }
        if !(self.penalty_scale.is_finite() && self.penalty_scale > 0.0) {
            return Err(invalid("penalty_scale", "must be positive"));
        }
        if !(self.failure_penalty.is_finite() && self.failure_penalty > 0.0) {
            return Err(invalid("failure_penalty", "must be positive"));
        }
        self.solver.validate()?;
        self.design.validate()
    }
}

/// Cooperative stop signal checked between generations.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every run holding a clone of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`CancellationToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Population fitness spread fell below the tolerance.
    Converged,
    /// The generation budget was exhausted.
    MaxGenerations,
    /// The cancellation token was triggered.
    Cancelled,
}

/// Section chosen for one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    /// Group label.
    pub group: String,
    /// Catalog index.
    pub section: usize,
    /// Catalog designation.
    pub designation: String,
}

/// Population statistics after one generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation number; zero is the initial population.
    pub generation: usize,
    /// Lowest fitness in the population.
    pub best_fitness: f64,
    /// Mean fitness of the population.
    pub mean_fitness: f64,
    /// Whether any feasible design has been seen so far.
    pub feasible_found: bool,
}

/// Result of a sizing run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Section per group, in group order.
    pub assignments: Vec<GroupAssignment>,
    /// Structural weight of the design in kg.
    pub total_weight: f64,
    /// Penalty added to the weight.
    pub penalty: f64,
    /// `total_weight + penalty`, or the failure penalty.
    pub fitness: f64,
    /// True when every design check is satisfied.
    pub feasible: bool,
    /// Largest normalised violation of the design, if it could be analysed.
    pub max_violation: Option<f64>,
    /// Generations executed after the initial population.
    pub generations: usize,
    /// Structural analyses performed.
    pub evaluations: usize,
    /// Fitness statistics per generation.
    pub history: Vec<GenerationRecord>,
    /// Why the run stopped.
    pub termination: Termination,
}

impl OptimizationReport {
    /// Catalog index per group, in group order.
    #[must_use]
    pub fn sections(&self) -> Vec<usize> {
        self.assignments
            .iter()
            .map(|assignment| assignment.section)
            .collect()
    }
}

/// Score of one discrete design.
#[derive(Clone, Debug, PartialEq)]
struct Evaluation {
    /// Catalog index per group.
    sections: Vec<usize>,
    /// Total member weight.
    weight: f64,
    /// Scaled constraint violation, or the failure penalty.
    penalty: f64,
    /// `weight + penalty`, or the failure penalty alone.
    fitness: f64,
    /// Every design check passed.
    feasible: bool,
    /// Largest violation; `None` when the analysis failed.
    max_violation: Option<f64>,
}

/// Differential-evolution sizing of a truss against a section catalog.
pub struct SizingOptimizer<'a, C: SectionCatalog + ?Sized> {
    /// Model whose members are sized.
    system: &'a TrussSystem,
    /// Sections available to every group.
    catalog: &'a C,
    /// Search, analysis and design options.
    config: &'a OptimizerConfig,
    /// Member groups sharing one section; one gene each.
    groups: Vec<MemberGroup>,
    /// Gene bounds per group.
    bounds: Vec<(f64, f64)>,
    /// Undeformed length and group index per member, in member order.
    members: Vec<(MemberId, f64, usize)>,
    /// Checked once per generation.
    cancel: CancellationToken,
}

impl<'a, C: SectionCatalog + ?Sized> SizingOptimizer<'a, C> {
    /// Prepare a run, validating the model, the grouping and the options.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for a malformed model or
    /// configuration, [`InputError::UngroupedMember`] and
    /// [`InputError::DuplicateGroupMember`] for an inconsistent grouping and
    /// [`CatalogError::EmptyCatalog`] for an empty catalog.
    pub fn new(
        system: &'a TrussSystem,
        catalog: &'a C,
        config: &'a OptimizerConfig,
    ) -> Result<Self, AnalysisError> {
        system.validate()?;
        config.validate()?;
        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog.into());
        }

        let groups = if config.groups.is_empty() {
            system
                .members()
                .map(|member| MemberGroup::new(member.id.to_string(), [member.id]))
                .collect()
        } else {
            config.groups.clone()
        };
        let members = group_members(system, &groups)?;

        let full_range = (-0.5, catalog.len() as f64 - 0.5);
        let bounds = match &config.bounds {
            None => vec![full_range; groups.len()],
            Some(bounds) if bounds.len() != groups.len() => {
                return Err(invalid("bounds", "need one (low, high) pair per member group").into());
            }
            Some(bounds) => {
                if bounds
                    .iter()
                    .any(|(low, high)| !(low.is_finite() && high.is_finite() && low < high))
                {
                    return Err(
                        invalid("bounds", "every pair must be finite with low < high").into()
                    );
                }
                bounds.clone()
            }
        };

        Ok(Self {
            system,
            catalog,
            config,
            groups,
            bounds,
            members,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop the run when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Groups being sized, in gene order.
    #[must_use]
    pub fn groups(&self) -> &[MemberGroup] {
        &self.groups
    }

    /// Copy of the model with `sections[g]` assigned to every member of group `g`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::CatalogLookup`] when an index is out of range.
    pub fn apply(&self, sections: &[usize]) -> Result<TrussSystem, AnalysisError> {
        let mut system = self.system.clone();
        for (member, _, group) in &self.members {
            let index = sections
                .get(*group)
                .copied()
                .ok_or_else(|| invalid("sections", "need one section per member group"))?;
            system.assign_section(*member, self.catalog, index)?;
        }
        Ok(system)
    }

    /// Structural weight of a design in kg.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::CatalogLookup`] when an index is out of range.
    pub fn weight(&self, sections: &[usize]) -> Result<f64, AnalysisError> {
        self.members
            .iter()
            .map(|(_, length, group)| -> Result<f64, AnalysisError> {
                let index = sections
                    .get(*group)
                    .copied()
                    .ok_or_else(|| invalid("sections", "need one section per member group"))?;
                Ok(self.catalog.lookup(index)?.unit_weight * length)
            })
            .sum()
    }

    /// Round genes to catalog indices.
    fn decode(&self, genes: &[f64]) -> Vec<usize> {
        genes
            .iter()
            .map(|gene| self.catalog.index_for_gene(*gene))
            .collect()
    }

    /// Analyse and check one candidate; failures score the failure penalty.
    fn evaluate(&self, genes: &[f64]) -> Evaluation {
        let sections = self.decode(genes);
        let weight = self.weight(&sections).unwrap_or(f64::INFINITY);
        let outcome = self.apply(&sections).and_then(|system| {
            let results = analyze(&system, &self.config.solver)?;
            ConstraintEvaluator::new(self.catalog, &self.config.design).evaluate(&system, &results)
        });
        match outcome {
            Ok(report) => {
                let penalty = report.penalty(self.config.penalty_scale);
                Evaluation {
                    fitness: weight + penalty,
                    feasible: report.is_satisfied(),
                    max_violation: report.max_violation(),
                    sections,
                    weight,
                    penalty,
                }
            }
            Err(error) => {
                warn!("design {sections:?} could not be analysed: {error}");
                Evaluation {
                    sections,
                    weight,
                    penalty: self.config.failure_penalty,
                    fitness: self.config.failure_penalty,
                    feasible: false,
                    max_violation: None,
                }
            }
        }
    }

    /// Score a whole population, in parallel when configured.
    fn evaluate_all(&self, population: &[Vec<f64>]) -> Vec<Evaluation> {
        if self.config.parallel {
            population.par_iter().map(|genes| self.evaluate(genes)).collect()
        } else {
            population.iter().map(|genes| self.evaluate(genes)).collect()
        }
    }

    /// Random or Latin hypercube start inside the gene bounds.
    fn initial_population(&self, rng: &mut StdRng) -> Vec<Vec<f64>> {
        let size = self.config.population_size;
        let mut population = vec![vec![0.0; self.bounds.len()]; size];
        for (dimension, (low, high)) in self.bounds.iter().enumerate() {
            match self.config.initialization {
                Initialization::LatinHypercube => {
                    let mut strata: Vec<usize> = (0..size).collect();
                    strata.shuffle(rng);
                    for (candidate, stratum) in population.iter_mut().zip(strata) {
                        let unit = (stratum as f64 + rng.gen::<f64>()) / size as f64;
                        candidate[dimension] = low + unit * (high - low);
                    }
                }
                Initialization::Random => {
                    for candidate in &mut population {
                        candidate[dimension] = rng.gen_range(*low..*high);
                    }
                }
            }
        }
        population
    }

    /// Build the trial vector for population slot `target`.
    fn trial(
        &self,
        population: &[Vec<f64>],
        target: usize,
        best: usize,
        scale: f64,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let picks: Vec<usize> = index::sample(rng, population.len() - 1, 3)
            .into_iter()
            .map(|pick| if pick >= target { pick + 1 } else { pick })
            .collect();
        let (base, plus, minus) = match self.config.strategy {
            Strategy::Best1Bin => (best, picks[0], picks[1]),
            Strategy::Rand1Bin => (picks[0], picks[1], picks[2]),
        };

        let dimensions = self.bounds.len();
        let forced = rng.gen_range(0..dimensions);
        let mut trial = population[target].clone();
        for (dimension, gene) in trial.iter_mut().enumerate() {
            if dimension == forced || rng.gen::<f64>() < self.config.crossover {
                *gene = population[base][dimension]
                    + scale * (population[plus][dimension] - population[minus][dimension]);
            }
        }
        for (gene, (low, high)) in trial.iter_mut().zip(&self.bounds) {
            if !(*gene >= *low && *gene <= *high) {
                *gene = rng.gen_range(*low..*high);
            }
        }
        trial
    }

    /// Summarise one generation's scores.
    fn record(generation: usize, fitness: &[Evaluation], feasible_found: bool) -> GenerationRecord {
        let best_fitness = fitness
            .iter()
            .map(|evaluation| evaluation.fitness)
            .fold(f64::INFINITY, f64::min);
        let mean_fitness = fitness
            .iter()
            .map(|evaluation| evaluation.fitness)
            .sum::<f64>()
            / fitness.len() as f64;
        GenerationRecord {
            generation,
            best_fitness,
            mean_fitness,
            feasible_found,
        }
    }

    /// Fitness spread is within `atol + tol * |mean|`.
    fn has_converged(&self, scores: &[Evaluation]) -> bool {
        let count = scores.len() as f64;
        let mean = scores.iter().map(|evaluation| evaluation.fitness).sum::<f64>() / count;
        let variance = scores
            .iter()
            .map(|evaluation| (evaluation.fitness - mean).powi(2))
            .sum::<f64>()
            / count;
        variance.sqrt() <= self.config.absolute_tolerance + self.config.tolerance * mean.abs()
    }

    /// Run the search.
    ///
    /// An infeasible outcome is not an error: the least-penalised design is
    /// returned with `feasible == false`.
    ///
    /// # Errors
    ///
    /// Only catalog lookups of the final design can fail, which the
    /// validation in [`SizingOptimizer::new`] rules out in practice.
    pub fn run(&self) -> Result<OptimizationReport, AnalysisError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut population = self.initial_population(&mut rng);
        let mut scores = self.evaluate_all(&population);
        let mut evaluations = scores.len();
        let mut archive: Option<Evaluation> = None;
        update_archive(&mut archive, &scores);
        let mut history = vec![Self::record(0, &scores, archive.is_some())];

        let mut generations = 0;
        let termination = loop {
            if self.has_converged(&scores) {
                break Termination::Converged;
            }
            if generations == self.config.max_generations {
                break Termination::MaxGenerations;
            }
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            generations += 1;

            let scale = self.config.mutation.sample(&mut rng);
            let best = best_index(&scores);
            let trials: Vec<Vec<f64>> = (0..population.len())
                .map(|target| self.trial(&population, target, best, scale, &mut rng))
                .collect();
            let trial_scores = self.evaluate_all(&trials);
            evaluations += trial_scores.len();
            update_archive(&mut archive, &trial_scores);

            for (slot, (trial, score)) in trials.into_iter().zip(trial_scores).enumerate() {
                if score.fitness <= scores[slot].fitness {
                    population[slot] = trial;
                    scores[slot] = score;
                }
            }
            let record = Self::record(generations, &scores, archive.is_some());
            debug!(
                "generation {generations}: best {:.4e}, mean {:.4e}",
                record.best_fitness, record.mean_fitness
            );
            history.push(record);
        };

        let chosen = match archive {
            Some(feasible) => feasible,
            None => scores[best_index(&scores)].clone(),
        };
        if chosen.feasible {
            info!(
                "sizing finished after {generations} generations ({termination:?}): \
                 weight {:.3} kg",
                chosen.weight
            );
        } else {
            warn!(
                "sizing finished after {generations} generations without a feasible design; \
                 least-penalised fitness {:.4e}",
                chosen.fitness
            );
        }

        let assignments = self
            .groups
            .iter()
            .zip(&chosen.sections)
            .map(|(group, section)| -> Result<GroupAssignment, AnalysisError> {
                Ok(GroupAssignment {
                    group: group.name.clone(),
                    section: *section,
                    designation: self.catalog.lookup(*section)?.designation.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OptimizationReport {
            assignments,
            total_weight: chosen.weight,
            penalty: chosen.penalty,
            fitness: chosen.fitness,
            feasible: chosen.feasible,
            max_violation: chosen.max_violation,
            generations,
            evaluations,
            history,
            termination,
        })
    }
}

/// Resolve every member to its group, rejecting gaps and overlaps.
fn group_members(
    system: &TrussSystem,
    groups: &[MemberGroup],
) -> Result<Vec<(MemberId, f64, usize)>, AnalysisError> {
    let mut seen = HashSet::new();
    for group in groups {
        if group.members.is_empty() {
            return Err(invalid("groups", "every member group needs at least one member").into());
        }
        for member in &group.members {
            if system.member(*member).is_none() {
                return Err(InputError::UnknownMember(*member).into());
            }
            if !seen.insert(*member) {
                return Err(InputError::DuplicateGroupMember(*member).into());
            }
        }
    }

    system
        .members()
        .map(|member| -> Result<(MemberId, f64, usize), AnalysisError> {
            let group = groups
                .iter()
                .position(|group| group.members.contains(&member.id))
                .ok_or(InputError::UngroupedMember(member.id))?;
            let length = system.member_geometry(member.id)?.length;
            Ok((member.id, length, group))
        })
        .collect()
}

/// Index of the lowest fitness; the first wins ties.
fn best_index(scores: &[Evaluation]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold(0, |best, (slot, score)| {
            if score.fitness < scores[best].fitness {
                slot
            } else {
                best
            }
        })
}

/// Keep the lightest feasible design seen so far.
fn update_archive(archive: &mut Option<Evaluation>, scores: &[Evaluation]) {
    for score in scores.iter().filter(|score| score.feasible) {
        if archive
            .as_ref()
            .map_or(true, |kept| score.fitness < kept.fitness)
        {
            *archive = Some(score.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SectionProperties, TableCatalog};
    use crate::geometry::{force, point, Restraint};
    use crate::truss::NodeId;

    /// Two bars hanging a 10 kN load, each 5 m long with 6250 N tension.
    fn hanger() -> TrussSystem {
        let mut truss = TrussSystem::new();
        for (id, position) in [
            (1, point(-3.0, 4.0, 0.0)),
            (2, point(3.0, 4.0, 0.0)),
            (3, point(0.0, 0.0, 0.0)),
        ] {
            truss.add_node(NodeId(id), position).expect("node added");
        }
        for id in [1, 2] {
            truss
                .set_restraint(NodeId(id), Restraint::FIXED)
                .expect("restraint applied");
        }
        truss
            .set_restraint(NodeId(3), Restraint::new(false, false, true))
            .expect("restraint applied");
        truss
            .add_load(NodeId(3), force(0.0, -10.0e3, 0.0))
            .expect("load applied");
        for (id, start) in [(1, 1), (2, 2)] {
            truss
                .add_member(MemberId(id), NodeId(start), NodeId(3), 200.0e9, 1.0e-3)
                .expect("member added");
        }
        truss
    }

    /// Index 0 fails the tension slenderness limit, 1 is the lightest passing section.
    fn catalog() -> TableCatalog {
        TableCatalog::new(vec![
            SectionProperties::new("thin", 1.0e-4, 0.010, 0.785),
            SectionProperties::new("medium", 2.0e-4, 0.020, 1.570),
            SectionProperties::new("heavy", 8.0e-4, 0.030, 6.280),
        ])
        .expect("valid catalog")
    }

    fn shared_group() -> OptimizerConfig {
        OptimizerConfig {
            groups: vec![MemberGroup::new("hangers", [MemberId(1), MemberId(2)])],
            population_size: 10,
            max_generations: 20,
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn finds_lightest_feasible_section() {
        let truss = hanger();
        let catalog = catalog();
        let config = shared_group();
        let optimizer = SizingOptimizer::new(&truss, &catalog, &config).expect("valid setup");
        let report = optimizer.run().expect("run completes");
        assert!(report.feasible);
        assert_eq!(report.sections(), vec![1]);
        assert_eq!(report.assignments[0].designation, "medium");
        assert!((report.total_weight - 2.0 * 5.0 * 1.570).abs() < 1.0e-9);
        assert_eq!(report.fitness, report.total_weight);
        assert_eq!(report.history.len(), report.generations + 1);
    }

    #[test]
    fn runs_are_reproducible() {
        let truss = hanger();
        let catalog = catalog();
        let config = OptimizerConfig {
            groups: Vec::new(),
            ..shared_group()
        };
        let optimizer = SizingOptimizer::new(&truss, &catalog, &config).expect("valid setup");
        let first = optimizer.run().expect("run completes");
        let second = optimizer.run().expect("run completes");
        assert_eq!(first, second);

        let serial = OptimizerConfig {
            parallel: false,
            ..config.clone()
        };
        let third = SizingOptimizer::new(&truss, &catalog, &serial)
            .expect("valid setup")
            .run()
            .expect("run completes");
        assert_eq!(first, third);
    }

    #[test]
    fn grouping_errors_are_reported() {
        let truss = hanger();
        let catalog = catalog();
        let missing = OptimizerConfig {
            groups: vec![MemberGroup::new("one", [MemberId(1)])],
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            SizingOptimizer::new(&truss, &catalog, &missing).err(),
            Some(AnalysisError::InvalidInput(InputError::UngroupedMember(MemberId(2))))
        ));

        let overlap = OptimizerConfig {
            groups: vec![
                MemberGroup::new("a", [MemberId(1), MemberId(2)]),
                MemberGroup::new("b", [MemberId(2)]),
            ],
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            SizingOptimizer::new(&truss, &catalog, &overlap).err(),
            Some(AnalysisError::InvalidInput(InputError::DuplicateGroupMember(MemberId(2))))
        ));
    }

    #[test]
    fn cancelled_run_stops_after_initial_population() {
        let truss = hanger();
        let catalog = catalog();
        let config = OptimizerConfig {
            tolerance: 0.0,
            ..shared_group()
        };
        let token = CancellationToken::new();
        token.cancel();
        let report = SizingOptimizer::new(&truss, &catalog, &config)
            .expect("valid setup")
            .with_cancellation(token)
            .run()
            .expect("run completes");
        assert_eq!(report.termination, Termination::Cancelled);
        assert_eq!(report.generations, 0);
        assert_eq!(report.evaluations, config.population_size);
    }

    #[test]
    fn gene_decoding_covers_catalog() {
        let truss = hanger();
        let catalog = catalog();
        let config = shared_group();
        let optimizer = SizingOptimizer::new(&truss, &catalog, &config).expect("valid setup");
        assert_eq!(optimizer.decode(&[-0.5]), vec![0]);
        assert_eq!(optimizer.decode(&[0.5]), vec![1]);
        assert_eq!(optimizer.decode(&[2.5]), vec![2]);
        let sized = optimizer.apply(&[2]).expect("sections assigned");
        assert_eq!(sized.member(MemberId(2)).and_then(|member| member.section), Some(2));
    }

    #[test]
    fn small_population_is_rejected() {
        let config = OptimizerConfig {
            population_size: 3,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InputError::InvalidParameter {
                name: "population_size",
                ..
            })
        ));
    }
}
