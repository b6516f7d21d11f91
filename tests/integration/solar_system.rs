//! Orbits and landings: exclusive component relations queried in both directions.

use entwine_foundation::{ComponentKey, EntityId, Label, LtSet, Type, Value};
use entwine_query::{Query, QueryEngine, RelationPattern, Target, Terms};
use entwine_storage::{Multiplicity, Registry, RegistryConfig, RelationSchema};

fn orbit_of() -> ComponentKey {
    ComponentKey::named("OrbitOf", Type::map(Type::String, Type::Int))
}

fn set(entities: &[EntityId]) -> LtSet<EntityId> {
    entities.iter().copied().collect()
}

fn relation(pattern: RelationPattern) -> Terms {
    Terms::new().relation(pattern)
}

struct System {
    registry: Registry,
    star: EntityId,
    planet: EntityId,
    moon: EntityId,
}

fn system() -> System {
    let mut registry = Registry::with_config(RegistryConfig::strict());
    registry
        .register_relation(
            RelationSchema::new(orbit_of()).with_multiplicity(Multiplicity::Exclusive),
        )
        .unwrap();
    let star = registry.entity("star");
    let planet = registry.entity("planet");
    let moon = registry.entity("moon");
    registry
        .set_relation_component(planet, orbit_of(), star, Value::record([("dist", 1000i64)]))
        .unwrap();
    registry
        .set_relation_component(moon, orbit_of(), planet, Value::record([("dist", 10i64)]))
        .unwrap();
    System {
        registry,
        star,
        planet,
        moon,
    }
}

#[test]
fn orbiting_a_specific_body() {
    let s = system();
    let query = Query::new()
        .all_of(relation(RelationPattern::origins(orbit_of(), s.planet)))
        .unwrap();
    assert_eq!(QueryEngine::new().get_entities(&s.registry, &query), set(&[s.moon]));
}

#[test]
fn orbiting_anything() {
    let s = system();
    let query = Query::new()
        .all_of(relation(RelationPattern::origins(orbit_of(), Target::Any)))
        .unwrap();
    assert_eq!(
        QueryEngine::new().get_entities(&s.registry, &query),
        set(&[s.planet, s.moon])
    );
}

#[test]
fn orbited_bodies() {
    let s = system();
    let query = Query::new()
        .all_of(relation(RelationPattern::targets(Target::Any, orbit_of())))
        .unwrap();
    assert_eq!(
        QueryEngine::new().get_entities(&s.registry, &query),
        set(&[s.star, s.planet])
    );
}

#[test]
fn payloads_are_readable() {
    let s = system();
    let payload = s
        .registry
        .relation_component(s.moon, &orbit_of(), s.planet)
        .unwrap();
    assert_eq!(payload.field("dist"), Some(&Value::Int(10)));
    assert_eq!(
        s.registry
            .relation_target(s.planet, &Label::from(orbit_of()))
            .unwrap(),
        s.star
    );
}

#[test]
fn exclusive_orbit_moves_the_moon() {
    let mut s = system();
    let mut engine = QueryEngine::new();
    let around_planet = Query::new()
        .all_of(relation(RelationPattern::origins(orbit_of(), s.planet)))
        .unwrap();
    assert_eq!(engine.count(&s.registry, &around_planet), 1);

    s.registry
        .set_relation_component(s.moon, orbit_of(), s.star, Value::record([("dist", 990i64)]))
        .unwrap();
    assert_eq!(engine.count(&s.registry, &around_planet), 0);
    assert_eq!(
        s.registry.relation_components(s.moon, &orbit_of()).unwrap(),
        vec![(s.star, Value::record([("dist", 990i64)]))]
    );
}

#[test]
fn landed_but_not_on_the_moon() {
    let mut registry = Registry::with_config(RegistryConfig::strict());
    let landed_on = Label::tag("LandedOn");
    let [moon, ship, moon_rock, player] =
        ["moon", "ship", "moon_rock", "player"].map(|uid| registry.entity(uid));
    registry.relate(ship, landed_on.clone(), moon).unwrap();
    registry.relate(moon_rock, landed_on.clone(), moon).unwrap();
    registry.relate(player, landed_on.clone(), moon_rock).unwrap();

    let query = Query::new()
        .all_of(relation(RelationPattern::origins(landed_on.clone(), Target::Any)))
        .unwrap()
        .none_of(relation(RelationPattern::origins(landed_on, moon)))
        .unwrap();
    assert_eq!(QueryEngine::new().get_entities(&registry, &query), set(&[player]));
}

#[test]
fn destroying_the_planet_strands_the_moon() {
    let mut s = system();
    let mut engine = QueryEngine::new();
    let orbiting = Query::new()
        .all_of(relation(RelationPattern::origins(orbit_of(), Target::Any)))
        .unwrap();
    assert_eq!(engine.count(&s.registry, &orbiting), 2);

    s.registry.destroy(s.planet).unwrap();
    assert_eq!(engine.get_entities(&s.registry, &orbiting), LtSet::new());
    assert!(s.registry.relation_components(s.moon, &orbit_of()).unwrap().is_empty());
}
