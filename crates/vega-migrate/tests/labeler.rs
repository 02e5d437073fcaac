use std::collections::HashSet;

use pretty_assertions::assert_eq;
use vega_migrate::{LabelerOptions, TypeMigrationLabeler, TypeRef};
use vega_model::{ElementId, MemoryModel, UsageKind};

fn long_type() -> TypeRef {
    TypeRef::new("long")
}

fn edge_elements(labeler: &TypeMigrationLabeler<'_>, element: ElementId) -> Vec<ElementId> {
    labeler
        .root_edges(element)
        .iter()
        .map(|(usage, _)| usage.element())
        .collect()
}

#[test]
fn recommitting_a_root_replaces_its_edge_set() {
    let mut model = MemoryModel::new();
    let root = model.add_element("root", "int", "A.java");
    let a = model.add_element("a", "int", "A.java");
    let b = model.add_element("b", "int", "A.java");
    model.add_dependency(root, a, UsageKind::Assignment);
    model.add_dependency(root, b, UsageKind::Assignment);

    let mut labeler = TypeMigrationLabeler::new(&model);
    let ty = long_type();
    let usage = labeler.add_migration_root(root, ty.clone()).expect("root");

    let raw = labeler.mark_root_usages(root, &ty).expect("discovery");
    labeler.set_root_and_migrate(&usage, &ty, raw.clone());
    assert_eq!(edge_elements(&labeler, root), vec![a, b]);

    // A second commit for the same root does not duplicate edges.
    labeler.set_root_and_migrate(&usage, &ty, raw);
    assert_eq!(edge_elements(&labeler, root), vec![a, b]);
    assert_eq!(
        labeler
            .migrated()
            .iter()
            .map(|(u, _)| u.element())
            .collect::<Vec<_>>(),
        vec![root, a, b]
    );
}

#[test]
fn duplicate_raw_sites_collapse_to_one_edge() {
    let mut model = MemoryModel::new();
    let root = model.add_element("root", "int", "A.java");
    let a = model.add_element("a", "int", "A.java");
    // Two syntactic sites, same dependent element.
    model.add_dependency(root, a, UsageKind::Assignment);
    model.add_dependency(root, a, UsageKind::Argument);

    let mut labeler = TypeMigrationLabeler::new(&model);
    let ty = long_type();
    let usage = labeler.add_migration_root(root, ty.clone()).expect("root");
    let raw = labeler.mark_root_usages(root, &ty).expect("discovery");
    labeler.set_root_and_migrate(&usage, &ty, raw);

    assert_eq!(edge_elements(&labeler, root), vec![a]);
}

#[test]
fn allowed_roots_restrict_propagation() {
    let mut model = MemoryModel::new();
    let root = model.add_element("root", "int", "A.java");
    let inside = model.add_element("inside", "int", "A.java");
    let outside = model.add_element("outside", "int", "B.java");
    model.add_dependency(root, inside, UsageKind::Assignment);
    model.add_dependency(root, outside, UsageKind::Assignment);

    let options = LabelerOptions {
        allowed_roots: Some(HashSet::from([root, inside])),
    };
    let mut labeler = TypeMigrationLabeler::with_options(&model, options);
    let ty = long_type();
    let usage = labeler.add_migration_root(root, ty.clone()).expect("root");
    let raw = labeler.mark_root_usages(root, &ty).expect("discovery");
    labeler.set_root_and_migrate(&usage, &ty, raw);

    // `outside` is silently skipped: not an edge, not a failure.
    assert_eq!(edge_elements(&labeler, root), vec![inside]);
    assert!(!labeler.has_failed_conversions());
}

#[test]
fn failure_records_deduplicate_by_element_and_type() {
    let mut model = MemoryModel::new();
    let root = model.add_element("root", "int", "A.java");
    let other = model.add_element("other", "int", "A.java");
    let stubborn = model.add_element("stubborn", "int", "A.java");
    model.add_dependency(root, other, UsageKind::Assignment);
    model.add_dependency(root, stubborn, UsageKind::Assignment);
    model.add_dependency(other, stubborn, UsageKind::Assignment);
    model.mark_fixed(stubborn);

    let mut labeler = TypeMigrationLabeler::new(&model);
    let ty = long_type();
    let root_usage = labeler.add_migration_root(root, ty.clone()).expect("root");
    let raw = labeler.mark_root_usages(root, &ty).expect("discovery");
    labeler.set_root_and_migrate(&root_usage, &ty, raw);

    let other_usage = labeler.usage(other).expect("interned").clone();
    let raw = labeler.mark_root_usages(other, &ty).expect("discovery");
    labeler.set_root_and_migrate(&other_usage, &ty, raw);

    // The same impossible conversion reached through two paths is reported once.
    assert_eq!(labeler.failed_usages().len(), 1);
    assert_eq!(labeler.failed_usages()[0].element, stubborn);
    assert_eq!(labeler.failed_usages_for(root).len(), 1);
    assert!(labeler.failed_usages_for(other).is_empty());
}

#[test]
fn migration_report_is_deterministic() {
    let mut model = MemoryModel::new();
    let root = model.add_element("b_root", "int", "A.java");
    let a = model.add_element("a_dep", "int", "A.java");
    let stubborn = model.add_element("stubborn", "int", "A.java");
    model.add_dependency(root, a, UsageKind::Assignment);
    model.add_dependency(root, stubborn, UsageKind::Assignment);
    model.mark_fixed(stubborn);

    let mut labeler = TypeMigrationLabeler::new(&model);
    let ty = long_type();
    let usage = labeler.add_migration_root(root, ty.clone()).expect("root");
    let raw = labeler.mark_root_usages(root, &ty).expect("discovery");
    labeler.set_root_and_migrate(&usage, &ty, raw);

    assert_eq!(
        labeler.migration_report(),
        "Types:\na_dep -> long\nb_root -> long\nFails:\nstubborn -> long\n"
    );
}
