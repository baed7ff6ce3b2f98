//! Inventory operations for agents.
//!
//! Inventories are hybrid: counted stacks of [`ResourceKind`] plus unique
//! [`Item`]s. All stack arithmetic is checked -- no silent overflow, no
//! negative counts. A stack that reaches zero is removed from the map so
//! invariant sweeps can assert "no zero or negative stacks".

use hearth_types::{Inventory, Item, ItemId, ResourceKind};

use crate::error::AgentError;

/// Add `amount` units of `resource` to the inventory.
pub fn add_stack(
    inventory: &mut Inventory,
    resource: ResourceKind,
    amount: u32,
) -> Result<(), AgentError> {
    let entry = inventory.stacks.entry(resource).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| AgentError::ArithmeticOverflow {
            context: format!("{resource} stack"),
        })?;
    Ok(())
}

/// Remove `amount` units of `resource`. Fails without mutating if the
/// stack is short. The key is dropped when the count reaches zero.
pub fn remove_stack(
    inventory: &mut Inventory,
    resource: ResourceKind,
    amount: u32,
) -> Result<(), AgentError> {
    let current = inventory.count(resource);
    if current < amount {
        return Err(AgentError::InsufficientResource {
            resource,
            requested: amount,
            available: current,
        });
    }
    let remaining = current.saturating_sub(amount);
    if remaining == 0 {
        inventory.stacks.remove(&resource);
    } else {
        inventory.stacks.insert(resource, remaining);
    }
    Ok(())
}

/// Whether the inventory holds at least `amount` of each resource in the
/// bag (counting duplicates: `[wood, wood]` needs two wood).
pub fn has_all(inventory: &Inventory, inputs: &[ResourceKind]) -> bool {
    let mut needed: std::collections::BTreeMap<ResourceKind, u32> = std::collections::BTreeMap::new();
    for &input in inputs {
        let entry = needed.entry(input).or_insert(0);
        *entry = entry.saturating_add(1);
    }
    needed
        .iter()
        .all(|(resource, amount)| inventory.count(*resource) >= *amount)
}

/// Remove one unit of every resource in the bag. Fails without mutating
/// if any stack is short.
pub fn remove_all(inventory: &mut Inventory, inputs: &[ResourceKind]) -> Result<(), AgentError> {
    if !has_all(inventory, inputs) {
        let short = inputs
            .iter()
            .copied()
            .find(|r| inventory.count(*r) == 0)
            .or_else(|| inputs.first().copied());
        let resource = short.unwrap_or(ResourceKind::Wood);
        return Err(AgentError::InsufficientResource {
            resource,
            requested: 1,
            available: inventory.count(resource),
        });
    }
    for &input in inputs {
        remove_stack(inventory, input, 1)?;
    }
    Ok(())
}

/// Add a unique item.
pub fn add_item(inventory: &mut Inventory, item: Item) {
    inventory.items.push(item);
}

/// Remove and return the first carried item of `kind`.
pub fn remove_item_by_kind(inventory: &mut Inventory, kind: &str) -> Result<Item, AgentError> {
    let index = inventory
        .items
        .iter()
        .position(|item| item.kind == kind)
        .ok_or_else(|| AgentError::MissingItem {
            kind: kind.to_owned(),
        })?;
    Ok(inventory.items.remove(index))
}

/// Every item id carried, for the uniqueness invariant sweep.
pub fn item_ids(inventory: &Inventory) -> impl Iterator<Item = ItemId> + '_ {
    inventory.items.iter().map(|item| item.id)
}
