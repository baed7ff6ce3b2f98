//! Categorical presence sensing.
//!
//! `sense_others` gives an agent rough bearings to every agent it knows:
//! an eight-way compass bucket and a coarse Chebyshev distance bucket.
//! Unknown agents are omitted. This is intentionally coarse -- no exact
//! positions ever leak through it.

use hearth_types::{AgentName, DistanceBucket, PresenceReading};

use crate::roster::Roster;

/// Build the presence readings for `observer`: one entry per known agent
/// currently on the roster, in name order.
pub fn sense_others(roster: &Roster, observer: &AgentName) -> Vec<PresenceReading> {
    let Some(agent) = roster.get(observer) else {
        return Vec::new();
    };

    agent
        .known_agents
        .iter()
        .filter_map(|name| roster.get(name))
        .map(|other| PresenceReading {
            other: other.name.clone(),
            direction: agent.position.compass_toward(other.position),
            distance: DistanceBucket::from_chebyshev(agent.position.chebyshev(other.position)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hearth_types::{Agent, CompassPoint, Position};

    use super::*;

    fn roster_with(pairs: &[(&str, u32, u32)]) -> Roster {
        let mut roster = Roster::new();
        for &(name, x, y) in pairs {
            let _ = roster.register(Agent::new(
                AgentName::from(name),
                "model",
                "",
                Position::new(x, y),
            ));
        }
        roster
    }

    #[test]
    fn unknown_agents_are_omitted() {
        let roster = roster_with(&[("Ash", 5, 5), ("Birch", 6, 6)]);
        // Ash has met nobody.
        assert!(sense_others(&roster, &AgentName::from("Ash")).is_empty());
    }

    #[test]
    fn readings_bucket_direction_and_distance() {
        let mut roster = roster_with(&[("Ash", 10, 10), ("Birch", 15, 5), ("Cedar", 10, 45)]);
        let ash = AgentName::from("Ash");
        let _ = roster.record_meeting(&ash, &AgentName::from("Birch"));
        let _ = roster.record_meeting(&ash, &AgentName::from("Cedar"));

        let readings = sense_others(&roster, &ash);
        assert_eq!(readings.len(), 2);

        let birch = readings.iter().find(|r| r.other.as_str() == "Birch");
        assert_eq!(birch.and_then(|r| r.direction), Some(CompassPoint::NE));
        assert_eq!(birch.map(|r| r.distance), Some(DistanceBucket::Nearby));

        let cedar = readings.iter().find(|r| r.other.as_str() == "Cedar");
        assert_eq!(cedar.and_then(|r| r.direction), Some(CompassPoint::S));
        assert_eq!(cedar.map(|r| r.distance), Some(DistanceBucket::VeryFar));
    }

    #[test]
    fn co_located_known_agent_has_no_direction() {
        let mut roster = roster_with(&[("Ash", 3, 3), ("Birch", 3, 3)]);
        let ash = AgentName::from("Ash");
        let _ = roster.record_meeting(&ash, &AgentName::from("Birch"));

        let readings = sense_others(&roster, &ash);
        assert_eq!(readings.first().and_then(|r| r.direction), None);
        assert_eq!(readings.first().map(|r| r.distance), Some(DistanceBucket::Nearby));
    }
}
