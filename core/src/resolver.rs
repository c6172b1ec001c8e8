//! Matches a device request to an entity of the required type.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ModelType;
use crate::world::{EntityId, World};

/// How the resolver treats an already-claimed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// The first pre-order match decides: if it is claimed the search fails,
    /// even when other unclaimed matches exist.
    #[default]
    FirstMatch,
    /// Claimed matches are passed over and the search carries on in pre-order.
    FirstUnclaimed,
}

/// Find an unclaimed entity of `required` type in the subtree under `root_name`.
///
/// Pre-order depth-first: the root itself wins if its type matches, otherwise
/// children are searched in stored order and the first subtree that yields a
/// match ends the search. If that first match is already claimed the whole
/// search reports [`Error::NotFound`]; later candidates are never considered.
pub fn resolve(
    world: &World,
    root_name: &str,
    required: ModelType,
    claimed: &HashSet<EntityId>,
) -> Result<EntityId> {
    resolve_with(world, root_name, required, claimed, ResolvePolicy::FirstMatch)
}

pub fn resolve_with(
    world: &World,
    root_name: &str,
    required: ModelType,
    claimed: &HashSet<EntityId>,
    policy: ResolvePolicy,
) -> Result<EntityId> {
    let root = world
        .lookup(root_name)
        .ok_or_else(|| Error::NameNotFound(root_name.to_string()))?;

    let found = match policy {
        ResolvePolicy::FirstMatch => first_match(world, root, required, claimed),
        ResolvePolicy::FirstUnclaimed => first_unclaimed(world, root, required, claimed),
    };
    found.ok_or_else(|| Error::NotFound { root: root_name.to_string(), model_type: required })
}

fn first_match(
    world: &World,
    id: EntityId,
    required: ModelType,
    claimed: &HashSet<EntityId>,
) -> Option<EntityId> {
    let entity = world.entity(id)?;
    if entity.model_type == required {
        return Some(id);
    }

    for &child in &entity.children {
        if let Some(found) = first_match(world, child, required, claimed) {
            if claimed.contains(&found) {
                debug!(entity = %world.entity(found)?.name, "first match already claimed");
                return None;
            }
            return Some(found);
        }
    }
    None
}

fn first_unclaimed(
    world: &World,
    id: EntityId,
    required: ModelType,
    claimed: &HashSet<EntityId>,
) -> Option<EntityId> {
    let entity = world.entity(id)?;
    if entity.model_type == required && !claimed.contains(&id) {
        return Some(id);
    }
    entity
        .children
        .iter()
        .find_map(|&child| first_unclaimed(world, child, required, claimed))
}
