//! The full mutable simulation state and the post-tick invariant sweep.
//!
//! The engine owns exactly one [`SimState`]; services are stateless façades
//! over it. Storage sees it only at load and commit. The invariant sweep
//! catches impossible states (wall mismatch, duplicate items, stale
//! invitations, dangling conversations) -- any violation aborts the tick and
//! preserves the last consistent state.

use std::collections::BTreeSet;

use hearth_types::{AgentName, ConversationId, InvitationId, ItemId, WorldMeta};
use hearth_social::SocialLedger;
use hearth_world::WorldGrid;

use crate::inventory;
use crate::roster::Roster;

/// An impossible state found by the invariant sweep.
#[derive(Debug, thiserror::Error)]
pub enum InvariantViolation {
    /// A wall exists without its mirror.
    #[error("wall symmetry violated: {source}")]
    WallSymmetry {
        /// The underlying world error.
        #[from]
        source: hearth_world::WorldError,
    },

    /// The same unique item id appears twice.
    #[error("item {id} appears in more than one inventory")]
    DuplicateItem {
        /// The duplicated item id.
        id: ItemId,
    },

    /// A pending invitation outlived the expiry window.
    #[error("invitation {id} is pending past its expiry window")]
    StaleInvitation {
        /// The overdue invitation.
        id: InvitationId,
    },

    /// An active conversation has nobody in it.
    #[error("conversation {id} is active with no participants")]
    EmptyConversation {
        /// The empty conversation.
        id: ConversationId,
    },

    /// An agent is present in two active conversations at once.
    #[error("{agent} is in more than one active conversation")]
    DoubleConversation {
        /// The over-committed agent.
        agent: AgentName,
    },

    /// The meeting ledger lost its symmetry.
    #[error("{a} knows {b} but not the reverse")]
    AsymmetricAcquaintance {
        /// The knowing side.
        a: AgentName,
        /// The unknowing side.
        b: AgentName,
    },
}

/// Everything the engine mutates during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimState {
    /// The world singleton: tick, bounds, weather.
    pub meta: WorldMeta,
    /// Geography: cells, objects, named places, structures.
    pub grid: WorldGrid,
    /// Agents.
    pub roster: Roster,
    /// Invitations and conversations.
    pub social: SocialLedger,
}

impl SimState {
    /// Assemble a state from its parts.
    pub const fn new(meta: WorldMeta, grid: WorldGrid, roster: Roster, social: SocialLedger) -> Self {
        Self {
            meta,
            grid,
            roster,
            social,
        }
    }

    /// Sweep every cross-cutting invariant. Called after each tick's
    /// phases, before commit; `current_tick` is the tick just processed.
    pub fn check_invariants(
        &self,
        current_tick: u64,
        expiry_ticks: u64,
    ) -> Result<(), InvariantViolation> {
        self.grid.check_wall_symmetry()?;
        self.check_item_uniqueness()?;
        self.check_invitation_ages(current_tick, expiry_ticks)?;
        self.check_conversations()?;
        self.check_acquaintance_symmetry()?;
        Ok(())
    }

    fn check_item_uniqueness(&self) -> Result<(), InvariantViolation> {
        let mut seen: BTreeSet<ItemId> = BTreeSet::new();
        for agent in self.roster.agents().values() {
            for id in inventory::item_ids(&agent.inventory) {
                if !seen.insert(id) {
                    return Err(InvariantViolation::DuplicateItem { id });
                }
            }
        }
        Ok(())
    }

    fn check_invitation_ages(
        &self,
        current_tick: u64,
        expiry_ticks: u64,
    ) -> Result<(), InvariantViolation> {
        for invitation in self.social.invitations().values() {
            if invitation.status == hearth_types::InvitationStatus::Pending
                && current_tick.saturating_sub(invitation.created_tick) >= expiry_ticks
            {
                return Err(InvariantViolation::StaleInvitation { id: invitation.id });
            }
        }
        Ok(())
    }

    fn check_conversations(&self) -> Result<(), InvariantViolation> {
        let mut membership: BTreeSet<AgentName> = BTreeSet::new();
        for conversation in self.social.conversations().values() {
            if !conversation.is_active() {
                continue;
            }
            let mut any = false;
            for name in conversation.present_participants() {
                any = true;
                if !membership.insert(name.clone()) {
                    return Err(InvariantViolation::DoubleConversation {
                        agent: name.clone(),
                    });
                }
            }
            if !any {
                return Err(InvariantViolation::EmptyConversation {
                    id: conversation.id,
                });
            }
        }
        Ok(())
    }

    fn check_acquaintance_symmetry(&self) -> Result<(), InvariantViolation> {
        for agent in self.roster.agents().values() {
            for known in &agent.known_agents {
                let reverse = self
                    .roster
                    .get(known)
                    .is_none_or(|other| other.known_agents.contains(&agent.name));
                if !reverse {
                    return Err(InvariantViolation::AsymmetricAcquaintance {
                        a: agent.name.clone(),
                        b: known.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hearth_types::{Agent, Inventory, Item, Position, Weather};

    use super::*;

    fn empty_state() -> SimState {
        SimState::new(
            WorldMeta {
                tick: 0,
                width: 20,
                height: 20,
                weather: Weather::Clear,
            },
            WorldGrid::new(20, 20),
            Roster::new(),
            SocialLedger::new(),
        )
    }

    #[test]
    fn fresh_state_passes_the_sweep() {
        let state = empty_state();
        assert!(state.check_invariants(0, 2).is_ok());
    }

    #[test]
    fn duplicate_item_ids_are_caught() {
        let mut state = empty_state();
        let shared = Item {
            id: ItemId::new(),
            kind: String::from("stone_axe"),
            properties: BTreeMap::new(),
        };
        let mut ash = Agent::new(AgentName::from("Ash"), "m", "", Position::new(0, 0));
        ash.inventory = Inventory {
            stacks: BTreeMap::new(),
            items: vec![shared.clone()],
        };
        let mut birch = Agent::new(AgentName::from("Birch"), "m", "", Position::new(1, 1));
        birch.inventory = Inventory {
            stacks: BTreeMap::new(),
            items: vec![shared],
        };
        let _ = state.roster.register(ash);
        let _ = state.roster.register(birch);

        assert!(matches!(
            state.check_invariants(0, 2),
            Err(InvariantViolation::DuplicateItem { .. })
        ));
    }

    #[test]
    fn stale_pending_invitations_are_caught() {
        let mut state = empty_state();
        let _ = state.social.send_invitation(
            AgentName::from("Ash"),
            AgentName::from("Birch"),
            hearth_types::Privacy::Public,
            1,
        );
        assert!(state.check_invariants(2, 2).is_ok());
        assert!(matches!(
            state.check_invariants(3, 2),
            Err(InvariantViolation::StaleInvitation { .. })
        ));
    }

    #[test]
    fn one_sided_acquaintance_is_caught() {
        let mut state = empty_state();
        let mut ash = Agent::new(AgentName::from("Ash"), "m", "", Position::new(0, 0));
        ash.known_agents.insert(AgentName::from("Birch"));
        let birch = Agent::new(AgentName::from("Birch"), "m", "", Position::new(1, 1));
        let _ = state.roster.register(ash);
        let _ = state.roster.register(birch);

        assert!(matches!(
            state.check_invariants(0, 2),
            Err(InvariantViolation::AsymmetricAcquaintance { .. })
        ));
    }
}
