use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bracket, Match, MatchState, PlayerId, ResultEntry, TournamentId};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub admitting: bool,
}

#[derive(Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentListParams {
    pub limit: Option<usize>,
    pub maintainer_id: Option<PlayerId>,
}

#[derive(Deserialize)]
pub struct RegisterPlayerRequest {
    pub username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub name: String,
    pub maintainer_id: PlayerId,
    pub start_date: NaiveDate,
    pub duration_days: i64,
    #[serde(default)]
    pub players: Vec<PlayerId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTournamentRequest {
    pub name: String,
    pub maintainer_id: PlayerId,
    pub start_date: NaiveDate,
    pub duration_days: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub player_id: PlayerId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub tournament_id: Option<TournamentId>,
    pub rounds: Option<usize>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub state: MatchState,
}

#[derive(Deserialize)]
pub struct RecordResultRequest {
    pub results: Vec<ResultEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentResponse {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub opponent_id: PlayerId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketResponse {
    pub master: Match,
    pub subs: Vec<Match>,
    pub complete: bool,
}

impl From<Bracket> for BracketResponse {
    fn from(bracket: Bracket) -> Self {
        let complete = bracket.is_complete();
        Self {
            master: bracket.master,
            subs: bracket.subs,
            complete,
        }
    }
}

/// `GET /api/matches/:id` answers with the whole bracket for master matches
#[derive(Serialize)]
#[serde(untagged)]
pub enum MatchResponse {
    Bracket(BracketResponse),
    Single(Match),
}
