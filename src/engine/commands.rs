//! Deferred structural mutation.
//!
//! Iteration holds the registry exclusively, so a visitor cannot create,
//! destroy, or re-shape entities directly. A [`CommandBuffer`] closes the
//! gap: the visitor records operations while the pass runs, and the host
//! applies them afterwards with [`CommandBuffer::apply`].
//!
//! Commands are applied in record order. A command whose target handle has
//! gone stale by apply time (the entity was destroyed and flushed first)
//! is skipped silently; all other contract rules are the same as for the
//! direct registry calls, including panics on duplicate or missing
//! components.

use std::any::Any;

use crate::engine::component::Component;
use crate::engine::entity::EntityRegistry;
use crate::engine::types::Entity;

type AddFn = fn(&mut EntityRegistry, Entity, Box<dyn Any + Send>);
type RemoveFn = fn(&mut EntityRegistry, Entity);

fn apply_add<C: Component>(registry: &mut EntityRegistry, entity: Entity, value: Box<dyn Any + Send>) {
    let value = value
        .downcast::<C>()
        .expect("command payload type mismatch");
    registry.add_component::<C>(entity, *value);
}

fn apply_replace<C: Component>(
    registry: &mut EntityRegistry,
    entity: Entity,
    value: Box<dyn Any + Send>,
) {
    let value = value
        .downcast::<C>()
        .expect("command payload type mismatch");
    registry.replace_component::<C>(entity, *value);
}

fn apply_remove<C: Component>(registry: &mut EntityRegistry, entity: Entity) {
    registry.remove_component::<C>(entity);
}

/// One recorded structural operation.
enum Command {
    Create,
    Destroy(Entity),
    Add {
        entity: Entity,
        value: Box<dyn Any + Send>,
        apply: AddFn,
    },
    Replace {
        entity: Entity,
        value: Box<dyn Any + Send>,
        apply: AddFn,
    },
    Remove {
        entity: Entity,
        apply: RemoveFn,
    },
}

/// Records structural mutations for later application.
///
/// ```
/// use rift::prelude::*;
///
/// #[derive(Default, Clone, PartialEq)]
/// struct Health(i32);
///
/// let mut entities = EntityRegistry::new();
/// let mut commands = CommandBuffer::new();
/// let e = entities.create_entity();
/// entities.add_component(e, Health(0));
///
/// entities.for_entities_with::<(Health,), _>(|entity, (health,)| {
///     if health.0 <= 0 {
///         commands.destroy(entity);
///     }
/// });
/// commands.apply(&mut entities);
/// entities.flush();
/// assert!(!entities.valid(e));
/// ```
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops every recorded command without applying it.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Records creation of a new empty entity.
    pub fn create(&mut self) {
        self.commands.push(Command::Create);
    }

    /// Records destruction of `entity`.
    pub fn destroy(&mut self, entity: Entity) {
        self.commands.push(Command::Destroy(entity));
    }

    /// Records attaching `value` to `entity`.
    pub fn add<C: Component>(&mut self, entity: Entity, value: C) {
        self.commands.push(Command::Add {
            entity,
            value: Box::new(value),
            apply: apply_add::<C>,
        });
    }

    /// Records overwriting the `C` owned by `entity`.
    pub fn replace<C: Component>(&mut self, entity: Entity, value: C) {
        self.commands.push(Command::Replace {
            entity,
            value: Box::new(value),
            apply: apply_replace::<C>,
        });
    }

    /// Records detaching the `C` owned by `entity`.
    pub fn remove<C: Component>(&mut self, entity: Entity) {
        self.commands.push(Command::Remove {
            entity,
            apply: apply_remove::<C>,
        });
    }

    /// Applies every recorded command in record order, draining the
    /// buffer. Commands targeting stale handles are skipped.
    pub fn apply(&mut self, registry: &mut EntityRegistry) {
        for command in self.commands.drain(..) {
            match command {
                Command::Create => {
                    registry.create_entity();
                }
                Command::Destroy(entity) => {
                    if registry.valid(entity) {
                        registry.destroy(entity);
                    }
                }
                Command::Add {
                    entity,
                    value,
                    apply,
                } => {
                    if registry.valid(entity) {
                        apply(registry, entity, value);
                    }
                }
                Command::Replace {
                    entity,
                    value,
                    apply,
                } => {
                    if registry.valid(entity) {
                        apply(registry, entity, value);
                    }
                }
                Command::Remove { entity, apply } => {
                    if registry.valid(entity) {
                        apply(registry, entity);
                    }
                }
            }
        }
    }
}
