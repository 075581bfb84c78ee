//! Reference table integration tests
//!
//! Exercises forking, shadowing, removal and flattening through the public API.

use tessel_compiler::{LocalReference, ReferenceKind, ReferenceTables, ScopeError, SymbolGenerator};

// ===== Visibility =====

#[test]
fn test_forked_table_sees_late_parent_bindings() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("foo"))
        .unwrap()
        .add(LocalReference::variable("bar"))
        .unwrap();

    let child = tables.fork(root).unwrap();
    tables
        .at_mut(child)
        .unwrap()
        .add(LocalReference::variable("baz"))
        .unwrap();

    let symbols = tables.symbols(child);
    assert_eq!(symbols.len(), 3);
    assert!(symbols.contains(&"baz"));

    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::variable("mrbean"))
        .unwrap();
    assert_eq!(tables.symbols(child).len(), 4);
    assert!(tables.has_reference_for(child, "mrbean"));

    tables.at_mut(child).unwrap().remove("baz");
    assert_eq!(tables.owned_references(child).len(), 0);
    assert_eq!(tables.symbols(child).len(), 3);
}

#[test]
fn test_child_bindings_hidden_from_parent() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    let child = tables.fork(root).unwrap();
    tables
        .at_mut(child)
        .unwrap()
        .add(LocalReference::constant("inner"))
        .unwrap();

    assert!(!tables.has_reference_for(root, "inner"));
    assert!(tables.get(root, "inner").is_none());
    assert!(tables.symbols(root).is_empty());
}

#[test]
fn test_remove_ignores_inherited_binding() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("foo"))
        .unwrap();
    let child = tables.fork(root).unwrap();

    assert!(tables.remove(child, "foo").is_none());
    assert!(tables.has_reference_for(child, "foo"));
    assert!(tables.has_reference_for(root, "foo"));
}

#[test]
fn test_redeclare_replaces_binding() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("x").with_index(0))
        .unwrap()
        .add(LocalReference::variable("x").with_index(4))
        .unwrap();

    assert_eq!(tables.owned_references(root).len(), 1);
    let x = tables.get(root, "x").unwrap();
    assert_eq!(x.kind(), ReferenceKind::Variable);
    assert_eq!(x.index(), Some(4));
}

#[test]
fn test_empty_name_rejected() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    let result = tables.at_mut(root).unwrap().add(LocalReference::constant(""));
    assert!(matches!(result, Err(ScopeError::InvalidReference)));
}

// ===== Flattening =====

#[test]
fn test_flat_copy_is_a_snapshot() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("a").with_index(7))
        .unwrap()
        .add(LocalReference::variable("b").with_index(8))
        .unwrap();
    let child = tables.fork(root).unwrap();
    tables
        .at_mut(child)
        .unwrap()
        .add(LocalReference::variable("a").with_index(9))
        .unwrap()
        .add(LocalReference::variable("c").with_index(10))
        .unwrap();

    let copy = tables.flat_deep_copy(child, false).unwrap();
    assert_eq!(tables.parent(copy), None);
    assert_eq!(tables.owned_references(copy).len(), tables.symbols(child).len());
    assert_eq!(tables.owned_symbols(copy), vec!["a", "b", "c"]);

    // The shadowing binding wins but keeps the outermost position.
    let a = tables.get(copy, "a").unwrap();
    assert_eq!(a.kind(), ReferenceKind::Variable);
    assert_eq!(a.index(), Some(0));
    assert_eq!(tables.get(copy, "c").unwrap().index(), Some(2));

    tables.get_owned_mut(child, "c").unwrap().set_index(42);
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("late"))
        .unwrap();
    assert_eq!(tables.get(copy, "c").unwrap().index(), Some(2));
    assert!(!tables.has_reference_for(copy, "late"));
}

#[test]
fn test_flat_copy_preserving_indices() {
    let mut tables = ReferenceTables::new();
    let root = tables.root();
    tables
        .at_mut(root)
        .unwrap()
        .add(LocalReference::constant("a").with_index(3))
        .unwrap();

    let copy = tables.flat_deep_copy(root, true).unwrap();
    assert_eq!(tables.get(copy, "a").unwrap().index(), Some(3));
}

// ===== Symbol generation =====

#[test]
fn test_generated_names_never_collide_with_tables() {
    let mut symbols = SymbolGenerator::new();
    let mut tables = ReferenceTables::new();
    let root = tables.root();

    symbols.enter("main");
    for _ in 0..10 {
        let name = symbols.next_with("tmp");
        assert!(SymbolGenerator::is_synthetic(&name));
        assert!(!tables.has_reference_for(root, &name));
        tables
            .at_mut(root)
            .unwrap()
            .add(LocalReference::constant(name))
            .unwrap();
    }
    symbols.exit();

    assert_eq!(tables.owned_references(root).len(), 10);
    assert!(tables.owned_references(root).iter().all(|r| r.is_synthetic()));
}
