pub mod connection;
pub mod matches;
pub mod players;
pub mod schedule;
pub mod setup;
pub mod tiers;
pub mod tournaments;

pub use connection::{create_memory_pool, create_pool, get_connection, DbConn, DbPool};
