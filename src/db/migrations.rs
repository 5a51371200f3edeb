use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `n` moves `user_version` from `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")?;
    usize::try_from(version).with_context(|| format!("invalid schema version {version}"))
}

/// Brings the preference schema up to date in a single transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let installed = schema_version(conn)?;
    let Some(pending) = MIGRATIONS.get(installed..) else {
        bail!(
            "preference database is at schema {installed}, newer than this build ({})",
            MIGRATIONS.len()
        );
    };
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (offset, script) in pending.iter().enumerate() {
        let target = installed + offset + 1;
        tx.execute_batch(script)
            .with_context(|| format!("failed to apply schema {target}"))?;
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
    tx.commit().context("failed to commit schema upgrade")?;

    log::info!(
        "Preference schema upgraded from {installed} to {}",
        MIGRATIONS.len()
    );
    Ok(())
}
