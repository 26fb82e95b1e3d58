//! Query cache coherence under structural mutation, signature laws, and
//! iteration behavior.

use std::collections::HashSet;

use rift::prelude::*;

#[derive(Default, Clone)]
struct Toggle {
    state: bool,
}

#[derive(Default, Clone)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Default, Clone)]
struct Direction {
    x: f64,
    y: f64,
}

#[derive(Default, Clone)]
struct Phantom(u8);

#[test]
fn counts_track_adds_and_removes() {
    let mut entities = EntityRegistry::new();
    let handles: Vec<Entity> = (0..4).map(|_| entities.create_entity()).collect();

    for &handle in &handles[..3] {
        entities.add_component(handle, Toggle::default());
    }
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 3);

    entities.add_component(handles[3], Toggle::default());
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 4);

    entities.remove_component::<Toggle>(handles[1]);
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 3);
}

#[test]
fn signatures_are_symmetric() {
    assert_eq!(
        signature_of::<(Position, Direction)>(),
        signature_of::<(Direction, Position)>()
    );
    assert_eq!(
        signature_of::<(Toggle, Position, Direction)>(),
        signature_of::<(Direction, Toggle, Position)>()
    );
}

#[test]
fn signature_is_the_or_of_families() {
    let signature = signature_of::<(Position, Direction)>();
    assert!(signature.test(family_of::<Position>()));
    assert!(signature.test(family_of::<Direction>()));
    assert_eq!(signature.count_ones(), 2);
    assert_eq!(
        signature,
        rift::engine::types::mask_for(&[family_of::<Position>(), family_of::<Direction>()])
    );
}

#[test]
#[should_panic(expected = "more than once in a query signature")]
fn repeated_component_types_in_a_signature_panic() {
    signature_of::<(Toggle, Toggle)>();
}

#[test]
fn multi_component_queries_require_every_family() {
    let mut entities = EntityRegistry::new();

    let both = entities.create_entity();
    entities.add_component(both, Position::default());
    entities.add_component(both, Direction::default());

    let position_only = entities.create_entity();
    entities.add_component(position_only, Position::default());

    assert_eq!(entities.number_of_entities_with::<(Position,)>(), 2);
    assert_eq!(entities.number_of_entities_with::<(Direction,)>(), 1);
    assert_eq!(
        entities.number_of_entities_with::<(Position, Direction)>(),
        1
    );

    let mut seen = Vec::new();
    entities.for_entities_with::<(Position, Direction), _>(|entity, _| seen.push(entity));
    assert_eq!(seen, vec![both]);
}

#[test]
fn cache_built_before_mutation_stays_coherent() {
    let mut entities = EntityRegistry::new();

    // Build the cache while it matches nothing, then mutate.
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 0);

    let a = entities.create_entity();
    entities.add_component(a, Toggle::default());
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 1);

    let b = entities.create_copy_of(a);
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 2);

    entities.remove_component::<Toggle>(b);
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 1);

    entities.destroy(a);
    entities.flush();
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 0);
}

#[test]
fn marked_entities_stay_in_caches_until_flush() {
    let mut entities = EntityRegistry::new();
    let a = entities.create_entity();
    entities.add_component(a, Toggle::default());

    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 1);

    entities.destroy(a);
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 1);

    let mut visited = 0;
    entities.for_entities_with::<(Toggle,), _>(|_, _| visited += 1);
    assert_eq!(visited, 1);

    entities.flush();
    assert_eq!(entities.number_of_entities_with::<(Toggle,)>(), 0);

    let mut visited = 0;
    entities.for_entities_with::<(Toggle,), _>(|_, _| visited += 1);
    assert_eq!(visited, 0);
}

#[test]
fn queries_over_never_added_components_match_nothing() {
    let mut entities = EntityRegistry::new();
    let a = entities.create_entity();
    entities.add_component(a, Toggle::default());

    assert_eq!(entities.number_of_entities_with::<(Phantom,)>(), 0);
    assert_eq!(entities.number_of_entities_with::<(Toggle, Phantom)>(), 0);

    let mut visited = 0;
    entities.for_entities_with::<(Phantom,), _>(|_, _| visited += 1);
    assert_eq!(visited, 0);
}

#[test]
fn visitors_see_each_matching_entity_exactly_once() {
    let mut entities = EntityRegistry::new();
    let handles: Vec<Entity> = (0..32).map(|_| entities.create_entity()).collect();
    for &handle in &handles {
        entities.add_component(handle, Toggle::default());
    }

    let mut seen = HashSet::new();
    entities.for_entities_with::<(Toggle,), _>(|entity, _| {
        assert!(seen.insert(entity), "entity visited twice");
    });
    let expected: HashSet<Entity> = handles.iter().copied().collect();
    assert_eq!(seen, expected);
}

#[test]
fn visitors_mutate_components_in_place() {
    let mut entities = EntityRegistry::new();
    for i in 0..8 {
        let e = entities.create_entity();
        entities.add_component(
            e,
            Position {
                x: f64::from(i),
                y: 0.0,
            },
        );
        entities.add_component(e, Direction { x: 0.0, y: 2.0 });
    }

    entities.for_entities_with::<(Position, Direction), _>(|_, (position, direction)| {
        position.y += direction.y;
    });

    let mut checked = 0;
    entities.for_entities_with::<(Position,), _>(|_, (position,)| {
        assert_eq!(position.y, 2.0);
        checked += 1;
    });
    assert_eq!(checked, 8);
}

#[test]
fn handles_passed_to_visitors_are_valid() {
    let mut entities = EntityRegistry::new();
    let a = entities.create_entity();
    entities.add_component(a, Toggle { state: true });

    let mut captured = Entity::INVALID;
    entities.for_entities_with::<(Toggle,), _>(|entity, _| captured = entity);

    assert_eq!(captured, a);
    assert!(entities.valid(captured));
}
