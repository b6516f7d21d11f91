//! Integration tests for inheritance resolution
//!
//! Tests fallback, override, multiple inheritance precedence, and cycles.

use entwine_foundation::{ComponentKey, EntityId, ErrorKind, Label, Type, Value};
use entwine_storage::{Registry, RegistryConfig};

fn name() -> ComponentKey {
    ComponentKey::named("name", Type::String)
}

// =============================================================================
// Fallback and Override
// =============================================================================

#[test]
fn derived_reads_base_until_overridden() {
    let mut registry = Registry::new();
    let base = registry.entity("B");
    let derived = registry.entity("D");
    registry.set_component(base, name(), Value::from("base")).unwrap();
    registry.relate(derived, Label::IsA, base).unwrap();

    assert_eq!(registry.component(derived, &name()).unwrap(), &Value::from("base"));

    registry.set_component(derived, name(), Value::from("own")).unwrap();
    assert_eq!(registry.component(derived, &name()).unwrap(), &Value::from("own"));
    assert_eq!(registry.component(base, &name()).unwrap(), &Value::from("base"));
}

#[test]
fn tags_and_relations_inherit() {
    let mut registry = Registry::new();
    let base = registry.new_entity();
    let star = registry.new_entity();
    registry.add_tag(base, "Rocky").unwrap();
    registry.relate(base, "OrbitOf", star).unwrap();
    let derived = registry.instantiate(base).unwrap();

    assert!(registry.has_tag(derived, &Value::from("Rocky")).unwrap());
    assert!(!registry.has_tag_local(derived, &Value::from("Rocky")));
    assert_eq!(registry.tags(derived).unwrap(), vec![Value::from("Rocky")]);
    assert!(registry.has_relation(derived, &Label::tag("OrbitOf"), star).unwrap());
    assert_eq!(registry.relation_target(derived, &Label::tag("OrbitOf")).unwrap(), star);
}

#[test]
fn inheritance_can_be_disabled() {
    let mut registry = Registry::with_config(RegistryConfig::without_inheritance());
    let base = registry.new_entity();
    registry.set_component(base, name(), Value::from("base")).unwrap();
    let derived = registry.instantiate(base).unwrap();

    assert!(registry.component(derived, &name()).unwrap_err().is_not_found());
    assert_eq!(
        registry
            .component_via(derived, &name(), &[Label::IsA])
            .unwrap(),
        &Value::from("base")
    );
}

// =============================================================================
// Multiple Inheritance
// =============================================================================

#[test]
fn closer_base_wins_over_edge_order() {
    let mut registry = Registry::new();
    let far = registry.new_entity();
    let near = registry.new_entity();
    let middle = registry.instantiate(far).unwrap();
    let leaf = registry.new_entity();
    registry.set_component(far, name(), Value::from("far")).unwrap();
    registry.set_component(near, name(), Value::from("near")).unwrap();

    registry.relate(leaf, Label::IsA, middle).unwrap();
    registry.relate(leaf, Label::IsA, near).unwrap();

    assert_eq!(registry.component(leaf, &name()).unwrap(), &Value::from("near"));
    assert_eq!(registry.lineage(leaf).unwrap(), vec![leaf, middle, near, far]);
}

#[test]
fn equal_depth_uses_edge_insertion_order() {
    let mut registry = Registry::new();
    let first = registry.new_entity();
    let second = registry.new_entity();
    let leaf = registry.new_entity();
    registry.set_component(first, name(), Value::from("first")).unwrap();
    registry.set_component(second, name(), Value::from("second")).unwrap();

    registry.relate(leaf, Label::IsA, second).unwrap();
    registry.relate(leaf, Label::IsA, first).unwrap();
    assert_eq!(registry.component(leaf, &name()).unwrap(), &Value::from("second"));
}

#[test]
fn traversal_label_order_sets_precedence() {
    let proto = Label::tag("Prototype");
    let mut registry = Registry::with_config(
        RegistryConfig::default().with_traverse([proto.clone(), Label::IsA]),
    );
    let by_isa = registry.new_entity();
    let by_proto = registry.new_entity();
    let leaf = registry.new_entity();
    registry.set_component(by_isa, name(), Value::from("isa")).unwrap();
    registry.set_component(by_proto, name(), Value::from("proto")).unwrap();

    registry.relate(leaf, Label::IsA, by_isa).unwrap();
    registry.relate(leaf, proto, by_proto).unwrap();
    assert_eq!(registry.component(leaf, &name()).unwrap(), &Value::from("proto"));
}

#[test]
fn diamonds_are_not_cycles() {
    let mut registry = Registry::new();
    let root = registry.new_entity();
    let left = registry.instantiate(root).unwrap();
    let right = registry.instantiate(root).unwrap();
    let leaf = registry.instantiate(left).unwrap();
    registry.relate(leaf, Label::IsA, right).unwrap();

    assert_eq!(registry.lineage(leaf).unwrap(), vec![leaf, left, right, root]);
    assert!(registry.component(leaf, &name()).unwrap_err().is_not_found());
}

// =============================================================================
// Cycles
// =============================================================================

/// `a -> d -> c -> b -> a`, with names on `a` and `c`.
fn cyclic() -> (Registry, [EntityId; 4]) {
    let mut registry = Registry::new();
    let [a, b, c, d] = ["A", "B", "C", "D"].map(|uid| registry.entity(uid));
    registry.relate(a, Label::IsA, d).unwrap();
    registry.relate(d, Label::IsA, c).unwrap();
    registry.relate(c, Label::IsA, b).unwrap();
    registry.relate(b, Label::IsA, a).unwrap();
    registry.set_component(a, name(), Value::from("A")).unwrap();
    registry.set_component(c, name(), Value::from("C")).unwrap();
    (registry, [a, b, c, d])
}

#[test]
fn cyclic_lineage_still_resolves_present_keys() {
    let (registry, [a, b, c, d]) = cyclic();
    assert_eq!(registry.component(a, &name()).unwrap(), &Value::from("A"));
    assert_eq!(registry.component(b, &name()).unwrap(), &Value::from("A"));
    assert_eq!(registry.component(c, &name()).unwrap(), &Value::from("C"));
    assert_eq!(registry.component(d, &name()).unwrap(), &Value::from("C"));
}

#[test]
fn missing_key_in_cycle_is_reported() {
    let (registry, [a, ..]) = cyclic();
    let missing = ComponentKey::named("missing", Type::Int);
    let err = registry.component(a, &missing).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CycleDetected { .. }));
    assert!(matches!(
        registry.lineage(a).unwrap_err().kind,
        ErrorKind::CycleDetected { .. }
    ));
}

#[test]
fn depth_bound_limits_fallback() {
    let mut registry =
        Registry::with_config(RegistryConfig::default().with_max_inheritance_depth(Some(1)));
    let root = registry.new_entity();
    registry.set_component(root, name(), Value::from("root")).unwrap();
    let child = registry.instantiate(root).unwrap();
    let grandchild = registry.instantiate(child).unwrap();

    assert!(registry.component(child, &name()).is_ok());
    assert!(registry.component(grandchild, &name()).unwrap_err().is_not_found());
}
