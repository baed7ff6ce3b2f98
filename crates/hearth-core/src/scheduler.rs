//! The scheduler: acting set and cluster formation.
//!
//! Two agents are clustered iff their Chebyshev distance is at most
//! `vision_radius + cluster_buffer` -- union-find over those pairs makes
//! each connected component a cluster. Because the cluster radius exceeds
//! vision, agents in different clusters cannot observe each other within
//! the tick, which is what lets clusters run concurrently.

use std::collections::BTreeSet;

use hearth_types::AgentName;
use hearth_agents::SimState;

/// One tick's schedule: clusters of acting agents, each in a stable
/// order (name order, with a forced agent moved to the head).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// The clusters, ordered by their first member's name.
    pub clusters: Vec<Vec<AgentName>>,
}

impl Schedule {
    /// All scheduled agents, flattened.
    pub fn acting(&self) -> impl Iterator<Item = &AgentName> {
        self.clusters.iter().flatten()
    }
}

/// Compute the acting set and its clusters.
///
/// An agent acts when it is awake, not in journey trance, and not being
/// skipped by an observer command. `force_next` reorders those agents to
/// their cluster's head for this tick; a forced agent in trance is
/// scheduled anyway, since the movement phase ends its trance before any
/// turn runs.
pub fn build_schedule(
    state: &SimState,
    cluster_radius: u32,
    skipped: &BTreeSet<AgentName>,
    force_next: &BTreeSet<AgentName>,
) -> Schedule {
    let acting: Vec<&hearth_types::Agent> = state
        .roster
        .agents()
        .values()
        .filter(|a| {
            !a.sleeping
                && (!a.in_trance() || force_next.contains(&a.name))
                && !skipped.contains(&a.name)
        })
        .collect();

    // Union-find over indices into `acting`.
    let mut parent: Vec<usize> = (0..acting.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while let Some(&next) = parent.get(root) {
            if next == root {
                break;
            }
            root = next;
        }
        // Path compression.
        let mut walk = i;
        while let Some(entry) = parent.get_mut(walk) {
            if *entry == root {
                break;
            }
            let next = *entry;
            *entry = root;
            walk = next;
        }
        root
    }

    for i in 0..acting.len() {
        for j in i.saturating_add(1)..acting.len() {
            let (Some(a), Some(b)) = (acting.get(i), acting.get(j)) else {
                continue;
            };
            if a.position.chebyshev(b.position) <= cluster_radius {
                let ra = find(&mut parent, i);
                let rb = find(&mut parent, j);
                if ra != rb
                    && let Some(entry) = parent.get_mut(rb)
                {
                    *entry = ra;
                }
            }
        }
    }

    let mut groups: std::collections::BTreeMap<usize, Vec<AgentName>> =
        std::collections::BTreeMap::new();
    for i in 0..acting.len() {
        let root = find(&mut parent, i);
        if let Some(agent) = acting.get(i) {
            groups.entry(root).or_default().push(agent.name.clone());
        }
    }

    let mut clusters: Vec<Vec<AgentName>> = groups
        .into_values()
        .map(|mut members| {
            members.sort_unstable();
            if let Some(pos) = members.iter().position(|name| force_next.contains(name))
                && pos > 0
            {
                let forced = members.remove(pos);
                members.insert(0, forced);
            }
            members
        })
        .collect();
    clusters.sort_by(|a, b| a.first().cmp(&b.first()));

    Schedule { clusters }
}

#[cfg(test)]
mod tests {
    use hearth_types::{Agent, Position, Weather, WorldMeta};
    use hearth_agents::Roster;
    use hearth_social::SocialLedger;
    use hearth_world::WorldGrid;

    use super::*;

    fn state_with(agents: &[(&str, u32, u32)]) -> SimState {
        let mut roster = Roster::new();
        for &(name, x, y) in agents {
            let _ = roster.register(Agent::new(
                AgentName::from(name),
                "m",
                "",
                Position::new(x, y),
            ));
        }
        SimState::new(
            WorldMeta {
                tick: 0,
                width: 100,
                height: 100,
                weather: Weather::Clear,
            },
            WorldGrid::new(100, 100),
            roster,
            SocialLedger::new(),
        )
    }

    #[test]
    fn nearby_agents_share_a_cluster() {
        let state = state_with(&[("Ash", 5, 5), ("Birch", 10, 5), ("Cedar", 60, 60)]);
        let schedule = build_schedule(&state, 10, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(schedule.clusters.len(), 2);
        assert_eq!(
            schedule.clusters.first().map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn clustering_is_transitive_through_chains() {
        // Ash-Birch within radius, Birch-Cedar within radius, Ash-Cedar
        // not: still one cluster.
        let state = state_with(&[("Ash", 0, 0), ("Birch", 9, 0), ("Cedar", 18, 0)]);
        let schedule = build_schedule(&state, 10, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(schedule.clusters.len(), 1);
        assert_eq!(schedule.clusters.first().map(Vec::len), Some(3));
    }

    #[test]
    fn sleeping_and_trance_agents_sit_out() {
        let mut state = state_with(&[("Ash", 0, 0), ("Birch", 1, 1), ("Cedar", 2, 2)]);
        if let Some(agent) = state.roster.get_mut(&AgentName::from("Ash")) {
            agent.sleeping = true;
        }
        if let Some(agent) = state.roster.get_mut(&AgentName::from("Birch")) {
            agent.journey = Some(hearth_types::Journey {
                destination: Position::new(9, 9),
                path: vec![Position::new(1, 1), Position::new(2, 1)],
                progress: 0,
            });
        }
        let schedule = build_schedule(&state, 10, &BTreeSet::new(), &BTreeSet::new());
        let acting: Vec<&AgentName> = schedule.acting().collect();
        assert_eq!(acting, vec![&AgentName::from("Cedar")]);
    }

    #[test]
    fn force_next_moves_an_agent_to_the_cluster_head() {
        let state = state_with(&[("Ash", 0, 0), ("Birch", 1, 1), ("Cedar", 2, 2)]);
        let forced: BTreeSet<AgentName> = [AgentName::from("Cedar")].into();
        let schedule = build_schedule(&state, 10, &BTreeSet::new(), &forced);
        assert_eq!(
            schedule.clusters.first().and_then(|c| c.first()),
            Some(&AgentName::from("Cedar"))
        );
    }

    #[test]
    fn skipped_agents_are_excluded() {
        let state = state_with(&[("Ash", 0, 0), ("Birch", 1, 1)]);
        let skipped: BTreeSet<AgentName> = [AgentName::from("Ash")].into();
        let schedule = build_schedule(&state, 10, &skipped, &BTreeSet::new());
        let acting: Vec<&AgentName> = schedule.acting().collect();
        assert_eq!(acting, vec![&AgentName::from("Birch")]);
    }
}
