use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

pub type PlayerId = i64;
pub type TournamentId = i64;
pub type MatchId = i64;

/// Registered player with the derived ranking fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub points: i64,
    pub last_rated: Option<NaiveDate>,
    pub tiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_days: i64,
    pub maintainer_id: PlayerId,
    pub participants: BTreeSet<PlayerId>,
    pub match_ids: Vec<MatchId>,
}

impl Tournament {
    /// Upcoming tournaments count as active, as do running ones up to and
    /// including the last day.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        today <= self.last_day()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.start_date + Duration::days(self.duration_days)
    }

    pub fn is_participant(&self, player_id: PlayerId) -> bool {
        self.participants.contains(&player_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    pub maintainer_id: PlayerId,
    pub start_date: NaiveDate,
    pub duration_days: i64,
    pub players: Vec<PlayerId>,
}

/// New values for a tournament's editable fields; the roster is untouched
#[derive(Debug, Clone)]
pub struct TournamentUpdate {
    pub name: String,
    pub maintainer_id: PlayerId,
    pub start_date: NaiveDate,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Master,
    Sub,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Master => "master",
            MatchKind::Sub => "sub",
        }
    }
}

impl FromStr for MatchKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(MatchKind::Master),
            "sub" => Ok(MatchKind::Sub),
            other => anyhow::bail!("Unknown match kind: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Ready,
    Running,
    Paused,
    Finished,
}

impl MatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Ready => "ready",
            MatchState::Running => "running",
            MatchState::Paused => "paused",
            MatchState::Finished => "finished",
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(MatchState::Ready),
            "running" => Ok(MatchState::Running),
            "paused" => Ok(MatchState::Paused),
            "finished" => Ok(MatchState::Finished),
            other => anyhow::bail!("Unknown match state: {}", other),
        }
    }
}

/// A player's finishing position inside a single match, 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Placement(u8);

impl Placement {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Placement {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Placement::new)
            .ok_or_else(|| format!("placement {} is outside 1..=4", value))
    }
}

impl From<Placement> for i64 {
    fn from(placement: Placement) -> Self {
        placement.0 as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub player_id: PlayerId,
    pub placement: Placement,
}

/// A submitted result line before its rank is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub player_id: PlayerId,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub kind: MatchKind,
    pub state: MatchState,
    pub roster: Vec<PlayerId>,
    pub results: Vec<MatchResult>,
}

impl Match {
    /// Look up the placement a player reached in this match.
    ///
    /// Returns `Ok(None)` when the player has no result entry and
    /// `CorruptResults` when the player appears more than once.
    pub fn placement_of(&self, player_id: PlayerId) -> Result<Option<Placement>, EngineError> {
        let mut found = self.results.iter().filter(|r| r.player_id == player_id);
        let first = found.next().map(|r| r.placement);
        if found.next().is_some() {
            return Err(EngineError::CorruptResults {
                match_id: self.id,
                player_id,
            });
        }
        Ok(first)
    }

    /// Players listed in the result roster
    pub fn result_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.results.iter().map(|r| r.player_id)
    }
}

/// A master match together with the sub matches it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub master: Match,
    pub subs: Vec<Match>,
}

impl Bracket {
    pub fn is_complete(&self) -> bool {
        self.subs.iter().all(|sub| sub.state == MatchState::Finished)
    }

    pub fn sub_ids(&self) -> Vec<MatchId> {
        self.subs.iter().map(|sub| sub.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub username: String,
    pub points: i64,
}
