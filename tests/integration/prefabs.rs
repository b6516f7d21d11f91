//! Prefab-style inheritance seen through both the registry and queries.

use std::sync::{Arc, Mutex};

use entwine_foundation::{ComponentKey, EntityId, Label, LtSet, Type, Value};
use entwine_query::{Column, Query, QueryEngine, Terms};
use entwine_storage::{Registry, RegistryConfig};

fn hp() -> ComponentKey {
    ComponentKey::named("hp", Type::Int)
}

fn armor() -> ComponentKey {
    ComponentKey::named("armor", Type::Int)
}

fn set(entities: &[EntityId]) -> LtSet<EntityId> {
    entities.iter().copied().collect()
}

#[test]
fn clear_removes_exactly_local_data() {
    let mut registry = Registry::with_config(RegistryConfig::strict());
    let prefab = registry.entity("orc-prefab");
    registry.set_component(prefab, hp(), Value::Int(15)).unwrap();
    registry.add_tag(prefab, "Monster").unwrap();

    let orc = registry.instantiate(prefab).unwrap();
    registry.set_component(orc, armor(), Value::Int(2)).unwrap();
    registry.add_tag(orc, "Angry").unwrap();

    let chieftain = registry.instantiate(orc).unwrap();
    registry.set_component(chieftain, hp(), Value::Int(40)).unwrap();

    registry.clear(orc).unwrap();

    // The orc lost its own data, including its is-a edge.
    assert!(registry.component_keys_local(orc).is_empty());
    assert!(registry.tags_local(orc).is_empty());
    assert!(registry.relation_labels(orc).is_empty());
    assert!(registry.component(orc, &hp()).unwrap_err().is_not_found());

    // Ancestor and descendant data are untouched.
    assert_eq!(registry.component(prefab, &hp()).unwrap(), &Value::Int(15));
    assert!(registry.has_tag_local(prefab, &Value::from("Monster")));
    assert_eq!(registry.component(chieftain, &hp()).unwrap(), &Value::Int(40));
    assert_eq!(registry.relation_targets_local(chieftain, &Label::IsA), vec![orc]);
}

#[test]
fn queries_and_reads_agree_on_inheritance() {
    let mut registry = Registry::new();
    let prefab = registry.entity("prefab");
    registry.set_component(prefab, hp(), Value::Int(10)).unwrap();
    let units: Vec<EntityId> = (0..4)
        .map(|_| registry.instantiate(prefab).unwrap())
        .collect();
    registry.set_component(units[0], hp(), Value::Int(3)).unwrap();

    let mut engine = QueryEngine::new();
    let query = Query::new().all_of(Terms::new().component(hp())).unwrap();
    let matched = engine.get_entities(&registry, &query);
    assert_eq!(matched.len(), 5);
    for e in matched.iter() {
        assert!(registry.has_component(*e, &hp()).unwrap());
    }

    let rows = engine
        .rows(&registry, &Query::new(), &[Column::Entity, Column::Component(hp())])
        .unwrap();
    for row in rows {
        let Value::EntityRef(e) = row[0] else {
            panic!("first column is not an entity");
        };
        assert_eq!(registry.component(e, &hp()).unwrap(), &row[1]);
    }
}

#[test]
fn hooks_can_query_the_new_state() {
    let mut registry = Registry::new();
    let alive = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&alive);
    registry.on_component_change(hp(), move |registry, _| {
        let query = Query::new().all_of(Terms::new().component(hp()).depth(0))?;
        let count = QueryEngine::new().count(registry, &query);
        sink.lock().unwrap().push(count);
        Ok(())
    });

    let a = registry.new_entity();
    let b = registry.new_entity();
    registry.set_component(a, hp(), Value::Int(1)).unwrap();
    registry.set_component(b, hp(), Value::Int(1)).unwrap();
    registry.remove_component(a, &hp()).unwrap();

    assert_eq!(*alive.lock().unwrap(), vec![1, 2, 1]);
}

#[test]
fn bounded_depth_matches_bounded_reads() {
    let mut registry =
        Registry::with_config(RegistryConfig::default().with_max_inheritance_depth(Some(1)));
    let root = registry.entity("root");
    registry.set_component(root, hp(), Value::Int(1)).unwrap();
    let child = registry.instantiate(root).unwrap();
    let grandchild = registry.instantiate(child).unwrap();

    let query = Query::new()
        .all_of(Terms::new().component(hp()).depth(1))
        .unwrap();
    let matched = QueryEngine::new().get_entities(&registry, &query);
    assert_eq!(matched, set(&[root, child]));
    assert!(registry.component(child, &hp()).is_ok());
    assert!(registry.component(grandchild, &hp()).is_err());
}

#[test]
fn cyclic_inheritance_terminates_in_queries() {
    let mut registry = Registry::new();
    let [a, b, c] = ["a", "b", "c"].map(|uid| registry.entity(uid));
    registry.relate(a, Label::IsA, b).unwrap();
    registry.relate(b, Label::IsA, c).unwrap();
    registry.relate(c, Label::IsA, a).unwrap();
    registry.add_tag(b, "Marked").unwrap();

    let query = Query::new().all_of(Terms::new().tag("Marked")).unwrap();
    assert_eq!(
        QueryEngine::new().get_entities(&registry, &query),
        set(&[a, b, c])
    );
    assert!(QueryEngine::new().exists(&registry, &query));
}
