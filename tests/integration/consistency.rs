//! Property tests over random mutation sequences.

use entwine_foundation::{EntityId, IndexKey, Label, Value};
use entwine_query::{Query, QueryConfig, QueryEngine, RelationPattern, Target, Terms};
use entwine_storage::{Registry, RegistryConfig};
use proptest::prelude::*;

const ENTITIES: usize = 6;

#[derive(Clone, Debug)]
enum Op {
    Relate(usize, u8, usize),
    Unrelate(usize, u8, usize),
    Tag(usize),
    Untag(usize),
    Clear(usize),
}

fn label(n: u8) -> Label {
    match n % 3 {
        0 => Label::IsA,
        1 => Label::tag("Near"),
        _ => Label::tag("Owns"),
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..ENTITIES, 0..3u8, 0..ENTITIES).prop_map(|(o, l, t)| Op::Relate(o, l, t)),
        2 => (0..ENTITIES, 0..3u8, 0..ENTITIES).prop_map(|(o, l, t)| Op::Unrelate(o, l, t)),
        2 => (0..ENTITIES).prop_map(Op::Tag),
        1 => (0..ENTITIES).prop_map(Op::Untag),
        1 => (0..ENTITIES).prop_map(Op::Clear),
    ]
}

fn apply(registry: &mut Registry, entities: &[EntityId], op: &Op) {
    match *op {
        Op::Relate(o, l, t) => {
            registry.relate(entities[o], label(l), entities[t]).unwrap();
        }
        Op::Unrelate(o, l, t) => {
            registry
                .unrelate(entities[o], &label(l), entities[t])
                .unwrap();
        }
        Op::Tag(e) => {
            registry.add_tag(entities[e], "Marked").unwrap();
        }
        Op::Untag(e) => {
            registry
                .discard_tag(entities[e], &Value::from("Marked"))
                .unwrap();
        }
        Op::Clear(e) => registry.clear(entities[e]).unwrap(),
    }
}

fn setup() -> (Registry, Vec<EntityId>) {
    let mut registry = Registry::with_config(RegistryConfig::strict());
    let entities = (0..ENTITIES)
        .map(|i| registry.entity(i64::try_from(i).unwrap()))
        .collect();
    (registry, entities)
}

fn queries() -> Vec<Query> {
    let marked = Query::new().all_of(Terms::new().tag("Marked")).unwrap();
    vec![
        Query::new(),
        marked.clone(),
        Query::new()
            .all_of(Terms::new().relation(RelationPattern::origins("Near", Target::Any)))
            .unwrap()
            .none_of(Terms::new().tag("Marked").depth(0))
            .unwrap(),
        Query::new()
            .all_of(Terms::new().relation(RelationPattern::targets(marked, "Owns")))
            .unwrap(),
        Query::new()
            .any_of(
                Terms::new()
                    .tag("Marked")
                    .relation(RelationPattern::origins("Owns", Target::Any))
                    .depth(1),
            )
            .unwrap(),
    ]
}

proptest! {
    #[test]
    fn forward_and_reverse_relations_agree(ops in prop::collection::vec(op(), 1..60)) {
        let (mut registry, entities) = setup();
        for op in &ops {
            apply(&mut registry, &entities, op);
        }

        for &origin in &entities {
            for l in 0..3u8 {
                let label = label(l);
                for &target in &entities {
                    let forward = registry.relation_targets_local(origin, &label).contains(&target);
                    let reverse = registry.relation_origins(&label, target).contains(&origin);
                    prop_assert_eq!(forward, reverse);
                }
            }
        }
        prop_assert!(registry.verify().is_ok());
    }

    #[test]
    fn repeated_discards_are_no_ops(ops in prop::collection::vec(op(), 0..30), e in 0..ENTITIES) {
        let (mut registry, entities) = setup();
        for op in &ops {
            apply(&mut registry, &entities, op);
        }

        let marked = Value::from("Marked");
        let near = Label::tag("Near");
        registry.discard_tag(entities[e], &marked).unwrap();
        registry.clear_relation(entities[e], &near).unwrap();
        let watched = [
            IndexKey::Tag(marked.clone()),
            IndexKey::Relation(near.clone()),
            IndexKey::Population,
        ];
        let before: Vec<u64> = watched.iter().map(|key| registry.version(key)).collect();

        prop_assert!(!registry.discard_tag(entities[e], &marked).unwrap());
        for &target in &entities {
            prop_assert!(!registry.unrelate(entities[e], &near, target).unwrap());
        }
        prop_assert_eq!(registry.clear_relation(entities[e], &near).unwrap(), 0);

        let after: Vec<u64> = watched.iter().map(|key| registry.version(key)).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn cached_engine_matches_fresh_engine(ops in prop::collection::vec(op(), 1..40)) {
        let (mut registry, entities) = setup();
        let mut cached = QueryEngine::new();
        let queries = queries();

        for op in &ops {
            apply(&mut registry, &entities, op);
            for query in &queries {
                let fresh = QueryEngine::with_config(QueryConfig::uncached())
                    .get_entities(&registry, query);
                prop_assert_eq!(&cached.get_entities(&registry, query), &fresh);
                prop_assert_eq!(QueryEngine::new().exists(&registry, query), !fresh.is_empty());
            }
        }
    }
}
