//! Integration tests for the relation index
//!
//! Tests plain and component relations, exclusivity, reverse lookups, and schemas.

use entwine_foundation::{ComponentKey, ErrorKind, IndexKey, Label, Type, Value};
use entwine_storage::{Multiplicity, OnDestroy, Registry, RegistryConfig, RelationSchema};

fn dist() -> ComponentKey {
    ComponentKey::named("dist", Type::Int)
}

fn strict() -> Registry {
    Registry::with_config(RegistryConfig::strict())
}

// =============================================================================
// Plain Relations
// =============================================================================

#[test]
fn forward_and_reverse_lookups_agree() {
    let mut registry = strict();
    let moon = registry.entity("moon");
    let ship = registry.entity("ship");
    let rock = registry.entity("moon_rock");
    let landed = Label::tag("LandedOn");

    registry.relate(ship, landed.clone(), moon).unwrap();
    registry.relate(rock, landed.clone(), moon).unwrap();

    assert_eq!(registry.relation_targets_local(ship, &landed), vec![moon]);
    let mut origins = vec![ship, rock];
    origins.sort_unstable();
    assert_eq!(registry.relation_origins(&landed, moon), origins);
    assert_eq!(registry.inbound_relation_labels(moon), vec![landed]);
}

#[test]
fn targets_keep_insertion_order() {
    let mut registry = strict();
    let hub = registry.new_entity();
    let a = registry.new_entity();
    let b = registry.new_entity();
    let c = registry.new_entity();
    let links = Label::tag("LinksTo");
    for target in [c, a, b] {
        registry.relate(hub, links.clone(), target).unwrap();
    }
    assert_eq!(registry.relation_targets_local(hub, &links), vec![c, a, b]);
}

#[test]
fn unrelating_absent_edge_is_quiet() {
    let mut registry = strict();
    let a = registry.new_entity();
    let b = registry.new_entity();
    let label = Label::tag("Knows");

    assert!(!registry.unrelate(a, &label, b).unwrap());
    assert!(registry.remove_relation(a, &label, b).unwrap_err().is_not_found());
}

#[test]
fn exclusive_get_on_multi_target_fails() {
    let mut registry = strict();
    let hub = registry.new_entity();
    let a = registry.new_entity();
    let b = registry.new_entity();
    let links = Label::tag("LinksTo");

    assert!(registry.relation_target(hub, &links).unwrap_err().is_not_found());
    registry.relate(hub, links.clone(), a).unwrap();
    assert_eq!(registry.relation_target(hub, &links).unwrap(), a);
    registry.relate(hub, links.clone(), b).unwrap();
    assert!(matches!(
        registry.relation_target(hub, &links).unwrap_err().kind,
        ErrorKind::NotExclusive { count: 2, .. }
    ));

    registry.set_relation(hub, links.clone(), b).unwrap();
    assert_eq!(registry.relation_targets_local(hub, &links), vec![b]);
}

#[test]
fn replace_and_clear_target_sets() {
    let mut registry = strict();
    let hub = registry.new_entity();
    let a = registry.new_entity();
    let b = registry.new_entity();
    let c = registry.new_entity();
    let links = Label::tag("LinksTo");

    registry.set_relation_targets(hub, links.clone(), [a, b]).unwrap();
    registry.set_relation_targets(hub, links.clone(), [b, c]).unwrap();
    let mut targets = registry.relation_targets_local(hub, &links);
    targets.sort_unstable();
    assert_eq!(targets, vec![b, c]);

    assert_eq!(registry.clear_relation(hub, &links).unwrap(), 2);
    assert!(registry.relation_labels(hub).is_empty());
}

// =============================================================================
// Component Relations
// =============================================================================

#[test]
fn component_relations_carry_payloads() {
    let mut registry = strict();
    let star = registry.entity("star");
    let planet = registry.entity("planet");
    let moon = registry.entity("moon");

    registry
        .set_relation_component(planet, dist(), star, Value::Int(1000))
        .unwrap();
    registry
        .set_relation_component(moon, dist(), planet, Value::Int(10))
        .unwrap();

    assert_eq!(
        registry.relation_component(moon, &dist(), planet).unwrap(),
        &Value::Int(10)
    );
    assert_eq!(
        registry.relation_components(planet, &dist()).unwrap(),
        vec![(star, Value::Int(1000))]
    );
    assert!(
        registry
            .relation_component(moon, &dist(), star)
            .unwrap_err()
            .is_not_found()
    );

    assert_eq!(
        registry
            .remove_relation_component(moon, &dist(), planet)
            .unwrap(),
        Value::Int(10)
    );
    assert!(registry.relation_components(moon, &dist()).unwrap().is_empty());
}

// =============================================================================
// Schemas
// =============================================================================

#[test]
fn exclusive_schema_replaces_targets() {
    let mut registry = strict();
    let orbit = Label::tag("OrbitOf");
    registry
        .register_relation(RelationSchema::new(orbit.clone()).with_multiplicity(Multiplicity::Exclusive))
        .unwrap();

    let moon = registry.entity("moon");
    let earth = registry.entity("earth");
    let mars = registry.entity("mars");
    registry.relate(moon, orbit.clone(), earth).unwrap();
    registry.relate(moon, orbit.clone(), mars).unwrap();

    assert_eq!(registry.relation_target(moon, &orbit).unwrap(), mars);
    assert!(registry.relation_origins(&orbit, earth).is_empty());
}

#[test]
fn exclusive_schema_rejects_several_targets() {
    let mut registry = strict();
    let owner = Label::tag("Owner");
    registry
        .register_relation(RelationSchema::new(owner.clone()).with_multiplicity(Multiplicity::Exclusive))
        .unwrap();

    let sword = registry.entity("sword");
    let alice = registry.entity("alice");
    let bob = registry.entity("bob");
    registry.relate(sword, owner.clone(), alice).unwrap();
    let before = registry.version(&IndexKey::Relation(owner.clone()));

    let err = registry
        .set_relation_targets(sword, owner.clone(), [alice, bob])
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotExclusive { count: 2, .. }));
    assert_eq!(registry.relation_target(sword, &owner).unwrap(), alice);
    assert!(registry.relation_origins(&owner, bob).is_empty());
    assert_eq!(registry.version(&IndexKey::Relation(owner.clone())), before);

    // A single target, even repeated, is still accepted.
    registry
        .set_relation_targets(sword, owner.clone(), [bob, bob])
        .unwrap();
    assert_eq!(registry.relation_target(sword, &owner).unwrap(), bob);
    assert!(registry.relation_origins(&owner, alice).is_empty());
}

#[test]
fn duplicate_schema_conflicts() {
    let mut registry = strict();
    registry
        .register_relation(RelationSchema::new("Inside"))
        .unwrap();
    let err = registry
        .register_relation(RelationSchema::new("Inside").with_on_destroy(OnDestroy::Cascade))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SchemaConflict(_)));
    assert_eq!(
        registry
            .relation_schema(&Label::tag("Inside"))
            .map(|s| s.on_destroy),
        Some(OnDestroy::Remove)
    );
}

#[test]
fn destroying_target_removes_inbound_edges() {
    let mut registry = strict();
    let planet = registry.entity("planet");
    let moon = registry.entity("moon");
    registry
        .set_relation_component(moon, dist(), planet, Value::Int(10))
        .unwrap();

    registry.destroy(planet).unwrap();
    assert!(registry.relation_components(moon, &dist()).unwrap().is_empty());
    assert!(registry.is_alive(moon));
    registry.verify().unwrap();
}
