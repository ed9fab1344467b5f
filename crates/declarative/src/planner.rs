//! Reconcile planner - decides which entities a run visits, and in which order

use crate::entity::Entity;
use crate::identity::Selector;
use crate::registry::Registry;
use crate::store::DefinitionStore;

/// Reason given for registered entities held back while declarations are broken
pub const UNLOADED_DECLARATIONS: &str =
    "not declared, but some declaration files failed to load; not scrubbing";

/// Ordered list of entities for one run
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub entities: Vec<Entity>,
}

impl ReconcilePlan {
    /// Build the plan for a run
    ///
    /// Declared entities come first, groups before users, each kind in
    /// discovery order. Orphans (registered but no longer declared) follow,
    /// sorted by identity. While the store has file-level errors, orphans are
    /// planned as invalid instead. Entities that exist only in the OS database are
    /// never part of a plan.
    pub fn build(store: &DefinitionStore, registry: &Registry, selectors: &[Selector]) -> Self {
        let mut entities = store.entities();
        // stable: keeps discovery order within a kind
        entities.sort_by_key(|e| e.identity.kind);

        // A declaration file that failed to load may still declare any of
        // the registered identities, so none of them can be scrubbed
        let unloaded = !store.errors().is_empty();
        let mut orphans: Vec<Entity> = registry
            .identities()
            .into_iter()
            .filter(|identity| !store.declares(identity))
            .map(|identity| {
                if unloaded {
                    Entity::invalid(identity, Vec::new(), UNLOADED_DECLARATIONS.to_string())
                } else {
                    Entity::orphan(identity)
                }
            })
            .collect();
        orphans.sort_by(|a, b| a.identity.to_string().cmp(&b.identity.to_string()));
        entities.extend(orphans);

        entities.retain(|e| Selector::any_matches(selectors, &e.identity));

        log::debug!("Planned {} entities", entities.len());
        Self { entities }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of orphans in the plan
    pub fn orphans(&self) -> usize {
        self.entities.iter().filter(|e| e.orphaned).count()
    }
}
