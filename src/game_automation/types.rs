// Types and enums for game automation
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of state identifiers shared by every bot.
///
/// Serialized as `SCREAMING_SNAKE_CASE` so `state_timeouts` tables in config
/// files read naturally (`WAITING_FOR_BITE = 25`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateId {
    // Generic states
    Starting,
    Finishing,
    Idle,
    // Fishing states
    CheckingRod,
    CastingBait,
    WaitingForBite,
    PlayingMinigame,
}

impl StateId {
    pub const ALL: [StateId; 7] = [
        StateId::Starting,
        StateId::Finishing,
        StateId::Idle,
        StateId::CheckingRod,
        StateId::CastingBait,
        StateId::WaitingForBite,
        StateId::PlayingMinigame,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateId::Starting => "STARTING",
            StateId::Finishing => "FINISHING",
            StateId::Idle => "IDLE",
            StateId::CheckingRod => "CHECKING_ROD",
            StateId::CastingBait => "CASTING_BAIT",
            StateId::WaitingForBite => "WAITING_FOR_BITE",
            StateId::PlayingMinigame => "PLAYING_MINIGAME",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown state id '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_id_round_trips_through_its_name() {
        for id in StateId::ALL {
            assert_eq!(id.as_str().parse::<StateId>().unwrap(), id);
        }
        assert_eq!("waiting_for_bite".parse::<StateId>().unwrap(), StateId::WaitingForBite);
        assert!("SLEEPING".parse::<StateId>().is_err());
    }
}
