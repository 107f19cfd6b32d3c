//! Unit tests for the target graph.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn graph() -> TargetGraph {
    TargetGraph::default()
}

fn names(graph: &TargetGraph) -> Vec<String> {
    graph
        .topological_order()
        .expect("acyclic graph")
        .map(|t| t.name().to_owned())
        .collect()
}

#[rstest]
fn dependencies_precede_dependents(mut graph: TargetGraph) {
    let app = graph
        .add_target("app", TargetKind::Executable, DirectoryId::ROOT)
        .expect("app");
    graph
        .add_target("lib", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("lib");
    graph
        .add_dependency(app, "lib", DependencyKind::Link)
        .expect("edge");
    assert_eq!(names(&graph), vec!["lib", "app"]);
}

#[rstest]
fn independent_targets_keep_declaration_order(mut graph: TargetGraph) {
    for name in ["zeta", "alpha", "mid"] {
        graph
            .add_target(name, TargetKind::Utility, DirectoryId::ROOT)
            .expect("target");
    }
    assert_eq!(names(&graph), vec!["zeta", "alpha", "mid"]);
}

#[rstest]
fn order_is_recomputed_after_mutation(mut graph: TargetGraph) {
    let a = graph
        .add_target("a", TargetKind::Utility, DirectoryId::ROOT)
        .expect("a");
    graph
        .add_target("b", TargetKind::Utility, DirectoryId::ROOT)
        .expect("b");
    assert_eq!(names(&graph), vec!["a", "b"]);
    graph
        .add_dependency(a, "b", DependencyKind::OrderOnly)
        .expect("edge");
    assert_eq!(names(&graph), vec!["b", "a"]);
}

#[rstest]
fn order_is_restartable(mut graph: TargetGraph) {
    graph
        .add_target("only", TargetKind::Utility, DirectoryId::ROOT)
        .expect("target");
    let first: Vec<_> = graph.topological_order().expect("order").collect();
    let second: Vec<_> = graph.topological_order().expect("order").collect();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}

#[rstest]
fn link_cycle_is_rejected_eagerly(mut graph: TargetGraph) {
    let a = graph
        .add_target("a", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("a");
    let b = graph
        .add_target("b", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("b");
    graph
        .add_dependency(a, "b", DependencyKind::Link)
        .expect("a -> b");
    let err = graph
        .add_dependency(b, "a", DependencyKind::Link)
        .expect_err("b -> a closes a cycle");
    assert_eq!(
        err,
        GraphError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        }
    );
    assert_eq!(graph.edges().len(), 1, "rejected edge must not be stored");
}

#[rstest]
fn self_link_is_a_cycle(mut graph: TargetGraph) {
    let a = graph
        .add_target("a", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("a");
    let err = graph
        .add_dependency(a, "a", DependencyKind::Link)
        .expect_err("self edge");
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
}

#[rstest]
fn forward_reference_cycle_is_rejected_once_resolvable(mut graph: TargetGraph) {
    let a = graph
        .add_target("a", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("a");
    graph
        .add_dependency(a, "b", DependencyKind::Link)
        .expect("forward reference");
    let b = graph
        .add_target("b", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("b");
    // `a -> b` resolves now, so `b -> a` closes a link cycle.
    let err = graph
        .add_dependency(b, "a", DependencyKind::Link)
        .expect_err("cycle");
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
}

#[rstest]
fn order_only_cycle_fails_topological_order(mut graph: TargetGraph) {
    let a = graph
        .add_target("a", TargetKind::Utility, DirectoryId::ROOT)
        .expect("a");
    let b = graph
        .add_target("b", TargetKind::Utility, DirectoryId::ROOT)
        .expect("b");
    graph
        .add_dependency(a, "b", DependencyKind::OrderOnly)
        .expect("a -> b");
    graph
        .add_dependency(b, "a", DependencyKind::OrderOnly)
        .expect("order-only edges are not checked eagerly");
    let err = graph.topological_order().expect_err("cycle");
    assert_eq!(
        err,
        GraphError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        }
    );
}

#[rstest]
fn duplicate_names_are_rejected(mut graph: TargetGraph) {
    graph
        .add_target("dup", TargetKind::Utility, DirectoryId::ROOT)
        .expect("first");
    let err = graph
        .add_target("dup", TargetKind::Executable, DirectoryId::ROOT)
        .expect_err("second");
    assert_eq!(err, GraphError::DuplicateTarget { name: "dup".into() });
}

#[rstest]
#[case("all")]
#[case("clean")]
#[case("subdir.lib")]
fn directory_rule_names_are_reserved(mut graph: TargetGraph, #[case] name: &str) {
    let err = graph
        .add_target(name, TargetKind::Executable, DirectoryId::ROOT)
        .expect_err("reserved name");
    assert_eq!(err, GraphError::ReservedTargetName { name: name.into() });
    assert!(graph.find(name).is_none());
    graph
        .add_target("all_tests", TargetKind::Utility, DirectoryId::ROOT)
        .expect("names merely starting with a reserved word are fine");
}

#[rstest]
fn unknown_directory_is_rejected(mut graph: TargetGraph) {
    let err = graph
        .add_target("x", TargetKind::Utility, DirectoryId(7))
        .expect_err("directory 7 does not exist");
    assert_eq!(err, GraphError::UnknownDirectory { index: 7 });
}

#[rstest]
fn resolve_reports_first_dangling_edge(mut graph: TargetGraph) {
    let app = graph
        .add_target("app", TargetKind::Executable, DirectoryId::ROOT)
        .expect("app");
    graph
        .add_dependency(app, "missing", DependencyKind::Link)
        .expect("forward reference");
    graph
        .add_dependency(app, "also-missing", DependencyKind::Link)
        .expect("forward reference");
    assert_eq!(
        graph.resolve(),
        Err(GraphError::UnresolvedDependency {
            dependent: "app".into(),
            dependency: "missing".into(),
        })
    );
}

#[rstest]
fn targets_partition_by_directory(mut graph: TargetGraph) {
    let sub = graph.add_directory("sub");
    graph
        .add_target("root", TargetKind::Utility, DirectoryId::ROOT)
        .expect("root");
    graph
        .add_target("nested", TargetKind::Utility, sub)
        .expect("nested");
    let total: usize = graph
        .directories()
        .iter()
        .map(|(id, _)| graph.targets_in(id).count())
        .sum();
    assert_eq!(total, graph.len());
    let nested: Vec<&str> = graph.targets_in(sub).map(|(_, t)| t.name()).collect();
    assert_eq!(nested, vec!["nested"]);
}
