//! Integration tests for result caching
//!
//! Tests that unrelated mutations are served from cache and dependent
//! mutations, including nested and inherited dependencies, recompute.

use entwine_foundation::{ComponentKey, EntityId, Label, LtSet, Type, Value};
use entwine_query::{Query, QueryEngine, RelationPattern, Terms};
use entwine_storage::Registry;

fn hp() -> ComponentKey {
    ComponentKey::named("hp", Type::Int)
}

fn set(entities: &[EntityId]) -> LtSet<EntityId> {
    entities.iter().copied().collect()
}

/// Evaluates `query` and reports whether the engine computed anything.
fn recomputed(engine: &mut QueryEngine, registry: &Registry, query: &Query) -> bool {
    let before = engine.stats().recomputations;
    engine.get_entities(registry, query);
    engine.stats().recomputations > before
}

#[test]
fn unrelated_mutations_are_served_from_cache() {
    let mut registry = Registry::new();
    let a = registry.entity("a");
    registry.add_tag(a, "Rocky").unwrap();

    let mut engine = QueryEngine::new();
    let query = Query::new().all_of(Terms::new().tag("Rocky")).unwrap();
    assert!(recomputed(&mut engine, &registry, &query));
    assert!(!recomputed(&mut engine, &registry, &query));

    let b = registry.entity("b");
    registry.add_tag(b, "Icy").unwrap();
    registry.set_component(b, hp(), Value::Int(1)).unwrap();
    registry.relate(b, "Near", a).unwrap();
    assert!(!recomputed(&mut engine, &registry, &query));
    assert_eq!(engine.get_entities(&registry, &query), set(&[a]));
}

#[test]
fn dependent_mutations_recompute() {
    let mut registry = Registry::new();
    let a = registry.entity("a");
    let b = registry.entity("b");
    registry.add_tag(a, "Rocky").unwrap();

    let mut engine = QueryEngine::new();
    let query = Query::new().all_of(Terms::new().tag("Rocky")).unwrap();
    engine.get_entities(&registry, &query);

    registry.add_tag(b, "Rocky").unwrap();
    assert!(recomputed(&mut engine, &registry, &query));
    assert_eq!(engine.get_entities(&registry, &query), set(&[a, b]));

    registry.discard_tag(a, &Value::from("Rocky")).unwrap();
    assert_eq!(engine.get_entities(&registry, &query), set(&[b]));
}

#[test]
fn structurally_equal_queries_share_entries() {
    let mut registry = Registry::new();
    let a = registry.entity("a");
    registry.add_tag(a, "Rocky").unwrap();
    registry.set_component(a, hp(), Value::Int(1)).unwrap();

    let mut engine = QueryEngine::new();
    let first = Query::new()
        .all_of(Terms::new().tag("Rocky").component(hp()))
        .unwrap();
    let second = Query::new()
        .all_of(Terms::new().component(hp()))
        .unwrap()
        .all_of(Terms::new().tag("Rocky"))
        .unwrap();
    assert!(recomputed(&mut engine, &registry, &first));
    assert!(!recomputed(&mut engine, &registry, &second));
}

#[test]
fn nested_dependencies_invalidate_outer_query() {
    let mut registry = Registry::new();
    let planet = registry.entity("planet");
    let moon = registry.entity("moon");
    registry.relate(moon, "OrbitOf", planet).unwrap();

    let mut engine = QueryEngine::new();
    let rocky = Query::new().all_of(Terms::new().tag("Rocky")).unwrap();
    let orbits_rocky = Query::new()
        .all_of(Terms::new().relation(RelationPattern::origins("OrbitOf", rocky)))
        .unwrap();
    assert!(engine.get_entities(&registry, &orbits_rocky).is_empty());

    registry.add_tag(planet, "Rocky").unwrap();
    assert_eq!(engine.get_entities(&registry, &orbits_rocky), set(&[moon]));
}

#[test]
fn inheritance_edges_invalidate_inherited_atoms() {
    let mut registry = Registry::new();
    let prefab = registry.entity("prefab");
    let unit = registry.entity("unit");
    registry.set_component(prefab, hp(), Value::Int(5)).unwrap();
    registry.add_tag(unit, "Selected").unwrap();

    let mut engine = QueryEngine::new();
    let query = Query::new().all_of(Terms::new().component(hp())).unwrap();
    assert_eq!(engine.get_entities(&registry, &query), set(&[prefab]));

    registry.relate(unit, Label::IsA, prefab).unwrap();
    assert_eq!(engine.get_entities(&registry, &query), set(&[prefab, unit]));

    registry.unrelate(unit, &Label::IsA, prefab).unwrap();
    assert_eq!(engine.get_entities(&registry, &query), set(&[prefab]));
}

#[test]
fn population_changes_invalidate_empty_queries() {
    let mut registry = Registry::new();
    let a = registry.entity("a");
    registry.add_tag(a, "A").unwrap();

    let mut engine = QueryEngine::new();
    assert_eq!(engine.get_entities(&registry, &Query::new()), set(&[a]));

    let b = registry.entity("b");
    registry.set_component(b, hp(), Value::Int(1)).unwrap();
    assert_eq!(engine.get_entities(&registry, &Query::new()), set(&[a, b]));

    registry.clear(a).unwrap();
    assert_eq!(engine.get_entities(&registry, &Query::new()), set(&[b]));
}
