//! Order number generation
//!
//! Human-readable, date-stamped: `SO` + `YYYYMMDD` + 6 random digits,
//! e.g. `SO20260825031847`. Candidates are checked for existence on the
//! caller's transaction connection and regenerated on collision, at
//! most [`MAX_ATTEMPTS`] times. The check is an optimization — the
//! UNIQUE index on `orders.order_number` is the real invariant, and a
//! racing transaction that slips past the check still fails at commit.

use crate::db::repository::{RepoError, RepoResult};
use rand::Rng;
use sqlx::SqliteConnection;

/// Retry budget for collision regeneration
pub const MAX_ATTEMPTS: u32 = 10;

const PREFIX: &str = "SO";
const SUFFIX_SPACE: u32 = 1_000_000;

/// Generate a unique order number on the caller's transaction.
///
/// The RNG is created per draw: `ThreadRng` is not `Send` and must not
/// be held across the existence-check awaits.
pub async fn generate(conn: &mut SqliteConnection) -> RepoResult<String> {
    generate_with(conn, || rand::thread_rng().gen_range(0..SUFFIX_SPACE)).await
}

/// Generation with a caller-supplied suffix source, so tests can drive
/// collisions deterministically.
pub async fn generate_with(
    conn: &mut SqliteConnection,
    mut next_suffix: impl FnMut() -> u32,
) -> RepoResult<String> {
    let date = chrono::Utc::now().format("%Y%m%d");
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = format!("{PREFIX}{date}{:06}", next_suffix() % SUFFIX_SPACE);
        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE order_number = ?")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
        tracing::warn!(candidate, attempt, "Order number collision, regenerating");
    }
    Err(RepoError::NumberExhausted(format!(
        "No unique order number after {MAX_ATTEMPTS} attempts"
    )))
}
