//! Versioned schema migrations.

use ::duckdb::Connection;

/// Ordered `(version, sql)` pairs. Append only; never edit an applied entry.
const MIGRATIONS: &[(i32, &str)] = &[
    (
        1,
        r"
CREATE SEQUENCE IF NOT EXISTS ingestion_runs_seq;
CREATE TABLE IF NOT EXISTS ingestion_runs (
    run_id VARCHAR PRIMARY KEY,
    seq BIGINT NOT NULL DEFAULT nextval('ingestion_runs_seq'),
    source VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    record_count BIGINT NOT NULL,
    started_at VARCHAR NOT NULL,
    finished_at VARCHAR NOT NULL,
    error VARCHAR
);
",
    ),
    (
        2,
        r"
CREATE TABLE IF NOT EXISTS prospects (
    id VARCHAR PRIMARY KEY,
    jurisdiction VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    score INTEGER NOT NULL,
    enriched_at VARCHAR NOT NULL,
    enriched_at_ms BIGINT NOT NULL,
    payload VARCHAR NOT NULL
);
",
    ),
];

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
/// Returns an error if a migration fails; earlier migrations stay applied.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
             version INTEGER PRIMARY KEY, \
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
    )?;

    let current = schema_version(connection)?;

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        connection.execute_batch("BEGIN TRANSACTION")?;
        let applied = connection
            .execute_batch(sql)
            .and_then(|()| {
                connection.execute("INSERT INTO schema_migrations (version) VALUES (?)", [*version])
            });
        match applied {
            Ok(_) => connection.execute_batch("COMMIT")?,
            Err(error) => {
                let _ = connection.execute_batch("ROLLBACK");
                return Err(error);
            }
        }
        tracing::debug!(version, "applied warehouse migration");
    }

    Ok(())
}

/// Highest applied schema version.
///
/// # Errors
/// Returns an error if the migrations table cannot be read.
pub fn schema_version(connection: &Connection) -> Result<i32, ::duckdb::Error> {
    connection.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}
