use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::domain::PlayerId;

/// Return the id of the named tier, creating it on first use.
pub fn ensure_tier(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO tiers (name) VALUES (?1)", params![name])
        .with_context(|| format!("Failed to create tier {}", name))?;

    conn.query_row("SELECT id FROM tiers WHERE name = ?1", params![name], |row| {
        row.get::<_, i64>(0)
    })
    .with_context(|| format!("Failed to look up tier {}", name))
}

/// Attach a tier to a player. Returns false when the player already held it.
pub fn attach(conn: &Connection, player_id: PlayerId, tier_id: i64) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO player_tiers (player_id, tier_id) VALUES (?1, ?2)";

    let inserted = conn
        .execute(sql, params![player_id, tier_id])
        .with_context(|| format!("Failed to attach tier {} to player {}", tier_id, player_id))?;
    Ok(inserted > 0)
}

pub fn list_for_player(conn: &Connection, player_id: PlayerId) -> Result<Vec<String>> {
    let sql = "SELECT t.name FROM tiers t JOIN player_tiers pt ON pt.tier_id = t.id \
               WHERE pt.player_id = ?1 ORDER BY t.name";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![player_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
