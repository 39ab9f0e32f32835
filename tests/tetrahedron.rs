use approx::assert_relative_eq;
use nalgebra::Vector3;
use spacetruss::{
    analyze, assemble_stiffness, force, point, AnalysisError, DofMap, ForceState, MemberId,
    NodeId, ProblemDefinition, Restraint, SolverConfig, TrussSystem,
};

/// Pinned triangular base with an apex carrying `load`.
fn tripod_with_load(load: [f64; 3]) -> TrussSystem {
    let mut truss = TrussSystem::new();
    let base = [
        (1, point(0.0, 0.0, 0.0)),
        (2, point(2.0, 0.0, 0.0)),
        (3, point(1.0, 2.0, 0.0)),
    ];
    for (id, position) in base {
        truss
            .add_node(NodeId(id), position)
            .expect("base node is valid");
        truss
            .set_restraint(NodeId(id), Restraint::FIXED)
            .expect("base node exists");
    }
    truss
        .add_node(NodeId(4), point(1.0, 0.7, 2.0))
        .expect("apex is valid");
    truss
        .add_load(NodeId(4), force(load[0], load[1], load[2]))
        .expect("apex exists");
    let members = [(1, 1, 4), (2, 2, 4), (3, 3, 4), (4, 1, 2), (5, 2, 3)];
    for (id, start, end) in members {
        truss
            .add_member(MemberId(id), NodeId(start), NodeId(end), 2.0e11, 5.0e-4)
            .expect("member is valid");
    }
    truss
}

/// The tripod with a lateral and vertical apex load.
fn pinned_tripod() -> TrussSystem {
    tripod_with_load([2_000.0, 0.0, -10_000.0])
}

fn benchmark() -> TrussSystem {
    ProblemDefinition::tetrahedron()
        .build_system()
        .expect("benchmark model is valid")
}

#[test]
fn base_members_between_supports_carry_no_force() {
    let truss = pinned_tripod();
    let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");

    for id in [MemberId(4), MemberId(5)] {
        let member = results.member(id).expect("member result is available");
        assert_eq!(member.axial_force, 0.0);
        assert_eq!(member.state, ForceState::ZeroForce);
    }
    for id in [MemberId(1), MemberId(2), MemberId(3)] {
        let member = results.member(id).expect("member result is available");
        assert_eq!(member.state, ForceState::Compression);
    }
    let apex = results
        .joint_displacement(NodeId(4))
        .expect("apex displacement is available");
    let work = apex.to_vector().dot(&Vector3::new(2_000.0, 0.0, -10_000.0));
    assert!(work > 0.0);
}

#[test]
fn vertical_apex_load_deflects_only_the_apex() {
    let truss = tripod_with_load([0.0, 0.0, -10_000.0]);
    let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");

    for id in [NodeId(1), NodeId(2), NodeId(3)] {
        let support = results
            .joint_displacement(id)
            .expect("support displacement is available");
        assert_eq!(support.x, 0.0);
        assert_eq!(support.y, 0.0);
    }
    let apex = results
        .joint_displacement(NodeId(4))
        .expect("apex displacement is available");
    assert!(apex.z < 0.0);
    assert!(results
        .members
        .iter()
        .any(|member| member.state == ForceState::Compression));

    let total = results.total_reaction();
    assert_relative_eq!(total.z, 10_000.0, max_relative = 1.0e-9);
}

#[test]
fn apex_forces_are_in_equilibrium() {
    let truss = pinned_tripod();
    let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");

    let apex = point(1.0, 0.7, 2.0).to_vector();
    let mut resultant = Vector3::new(2_000.0, 0.0, -10_000.0);
    for (id, base) in [
        (MemberId(1), point(0.0, 0.0, 0.0)),
        (MemberId(2), point(2.0, 0.0, 0.0)),
        (MemberId(3), point(1.0, 2.0, 0.0)),
    ] {
        let axial = results
            .member_axial_force(id)
            .expect("member result is available");
        // A tensile member pulls the apex towards its base.
        resultant += axial * (base.to_vector() - apex).normalize();
    }
    assert_relative_eq!(resultant.norm(), 0.0, epsilon = 1.0e-6);
}

#[test]
fn benchmark_reactions_balance_load_and_moment() {
    let truss = benchmark();
    let results = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");
    let load = Vector3::new(0.0, 50.0e3, -100.0e3);

    let total = results.total_reaction().to_vector();
    assert_relative_eq!((total + load).norm(), 0.0, epsilon = 1.0e-6);

    let mut moment = point(1.5, 1.5, 4.0).to_vector().cross(&load);
    for node in truss.nodes() {
        let reaction = results
            .reaction(node.id)
            .expect("node result is available")
            .to_vector();
        moment += node.position.to_vector().cross(&reaction);
    }
    assert_relative_eq!(moment.norm(), 0.0, epsilon = 1.0e-3);
}

#[test]
fn assembled_stiffness_is_symmetric() {
    let truss = benchmark();
    let dofs = DofMap::new(&truss);
    let stiffness = assemble_stiffness(&truss, &dofs).expect("assembly succeeds");

    assert_eq!(stiffness.nrows(), 12);
    let scale = stiffness.amax();
    for row in 0..stiffness.nrows() {
        for col in 0..row {
            assert_relative_eq!(
                stiffness[(row, col)],
                stiffness[(col, row)],
                epsilon = scale * 1.0e-14
            );
        }
    }
}

#[test]
fn unsupported_structure_is_singular() {
    let mut truss = benchmark();
    for id in [NodeId(1), NodeId(2), NodeId(3)] {
        truss
            .set_restraint(id, Restraint::FREE)
            .expect("node exists");
    }
    let error = analyze(&truss, &SolverConfig::linear()).expect_err("rigid body motion");
    assert!(matches!(error, AnalysisError::SingularStiffness { .. }));
}

#[test]
fn repeated_analysis_is_identical() {
    let truss = benchmark();
    let first = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");
    let second = analyze(&truss, &SolverConfig::linear()).expect("analysis succeeds");
    assert_eq!(first, second);
}
