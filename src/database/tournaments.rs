use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{
    MatchId, NewTournament, PlayerId, Tournament, TournamentId, TournamentUpdate,
};

const TOURNAMENT_COLUMNS: &str = "id, name, start_date, duration_days, maintainer_id";

pub fn insert_tournament(conn: &Connection, tournament: &NewTournament) -> Result<TournamentId> {
    let sql = "INSERT INTO tournaments (name, start_date, duration_days, maintainer_id) \
               VALUES (?1, ?2, ?3, ?4) RETURNING id";

    conn.query_row(
        sql,
        params![
            tournament.name,
            tournament.start_date,
            tournament.duration_days,
            tournament.maintainer_id
        ],
        |row| row.get::<_, TournamentId>(0),
    )
    .with_context(|| format!("Failed to insert tournament {}", tournament.name))
}

/// Returns false when no tournament has this id.
pub fn update_tournament(
    conn: &Connection,
    id: TournamentId,
    update: &TournamentUpdate,
) -> Result<bool> {
    let sql = "UPDATE tournaments \
               SET name = ?1, start_date = ?2, duration_days = ?3, maintainer_id = ?4 \
               WHERE id = ?5";

    let updated = conn
        .execute(
            sql,
            params![update.name, update.start_date, update.duration_days, update.maintainer_id, id],
        )
        .with_context(|| format!("Failed to update tournament {}", id))?;
    Ok(updated > 0)
}

/// Returns false when the player was already a participant.
pub fn add_player(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO tournament_players (tournament_id, player_id) VALUES (?1, ?2)";

    let inserted = conn
        .execute(sql, params![tournament_id, player_id])
        .context("Failed to add tournament participant")?;
    Ok(inserted > 0)
}

pub fn link_match(conn: &Connection, tournament_id: TournamentId, match_id: MatchId) -> Result<()> {
    let sql = "INSERT OR IGNORE INTO tournament_matches (tournament_id, match_id) VALUES (?1, ?2)";

    conn.execute(sql, params![tournament_id, match_id])
        .context("Failed to link match to tournament")
        .map(|_| ())
}

fn parse_tournament_row(row: &rusqlite::Row) -> rusqlite::Result<Tournament> {
    Ok(Tournament {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        duration_days: row.get(3)?,
        maintainer_id: row.get(4)?,
        participants: Default::default(),
        match_ids: Vec::new(),
    })
}

fn load_members(conn: &Connection, tournament: &mut Tournament) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT player_id FROM tournament_players WHERE tournament_id = ?1")?;
    tournament.participants = stmt
        .query_map(params![tournament.id], |row| row.get::<_, PlayerId>(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT match_id FROM tournament_matches WHERE tournament_id = ?1 ORDER BY match_id",
    )?;
    tournament.match_ids = stmt
        .query_map(params![tournament.id], |row| row.get::<_, MatchId>(0))?
        .collect::<rusqlite::Result<_>>()?;

    Ok(())
}

pub fn find_by_id(conn: &Connection, id: TournamentId) -> Result<Option<Tournament>> {
    let sql = format!("SELECT {} FROM tournaments WHERE id = ?1", TOURNAMENT_COLUMNS);

    let tournament = conn
        .query_row(&sql, params![id], parse_tournament_row)
        .optional()
        .context("Failed to query tournament by id")?;

    match tournament {
        Some(mut tournament) => {
            load_members(conn, &mut tournament)?;
            Ok(Some(tournament))
        }
        None => Ok(None),
    }
}

pub fn list_all(conn: &Connection) -> Result<Vec<Tournament>> {
    let sql = format!("SELECT {} FROM tournaments ORDER BY start_date, id", TOURNAMENT_COLUMNS);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map([], parse_tournament_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for tournament in rows.iter_mut() {
        load_members(conn, tournament)?;
    }

    Ok(rows)
}

/// Participants of a tournament with their current points
pub fn list_participant_points(
    conn: &Connection,
    tournament_id: TournamentId,
) -> Result<Vec<(PlayerId, i64)>> {
    let sql = "SELECT p.id, p.points FROM tournament_players tp \
               JOIN players p ON p.id = tp.player_id \
               WHERE tp.tournament_id = ?1";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![tournament_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Tournaments a match is linked to
pub fn list_for_match(conn: &Connection, match_id: MatchId) -> Result<Vec<TournamentId>> {
    let mut stmt =
        conn.prepare("SELECT tournament_id FROM tournament_matches WHERE match_id = ?1")?;
    let rows = stmt
        .query_map(params![match_id], |row| row.get::<_, TournamentId>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn is_participant(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<bool> {
    let sql = "SELECT EXISTS(SELECT 1 FROM tournament_players \
               WHERE tournament_id = ?1 AND player_id = ?2)";

    conn.query_row(sql, params![tournament_id, player_id], |row| row.get::<_, bool>(0))
        .context("Failed to check tournament membership")
}
