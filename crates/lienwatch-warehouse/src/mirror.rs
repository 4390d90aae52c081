//! Source adapter backed by a local `DuckDB` mirror of a filing database.
//!
//! The mirror table is expected to carry the columns `filing_number`,
//! `filing_date`, `debtor_name`, `secured_party_name`, `jurisdiction`,
//! `lien_amount`, `status` and `filing_type`. Connection parameters:
//!
//! | Key | Required | Default |
//! |-----|----------|---------|
//! | `path` | yes | |
//! | `mirror_table` | no | `ucc_filings` |

use std::path::{Path, PathBuf};

use ::duckdb::{AccessMode, Config, Connection};
use lienwatch_core::{
    ConfigError, FetchFuture, Jurisdiction, RawAmount, RawFiling, SourceAdapter, SourceConfig,
    SourceError, SourceKind,
};

pub const DEFAULT_MIRROR_TABLE: &str = "ucc_filings";

pub struct MirrorAdapter {
    name: String,
    db_path: PathBuf,
    query: String,
}

impl MirrorAdapter {
    /// # Errors
    ///
    /// Fails when `table` is not a plain (optionally schema-qualified)
    /// identifier.
    pub fn new(
        name: impl Into<String>,
        db_path: impl Into<PathBuf>,
        table: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if !is_table_identifier(table) {
            return Err(ConfigError::InvalidConnectionParam {
                name,
                key: "mirror_table",
                value: table.to_owned(),
            });
        }

        Ok(Self {
            name,
            db_path: db_path.into(),
            query: select_sql(table),
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let path = config.require_param("path")?;
        let table = config.param("mirror_table").unwrap_or(DEFAULT_MIRROR_TABLE);
        Self::new(config.name.clone(), path, table)
    }

    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }
}

impl SourceAdapter for MirrorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Database
    }

    fn fetch<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> FetchFuture<'a> {
        let db_path = self.db_path.clone();
        let query = self.query.clone();
        let code = jurisdiction.as_str().to_owned();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || read_mirror(&db_path, &query, &code))
                .await
                .map_err(|error| {
                    SourceError::transient(format!("mirror read task failed: {error}"))
                })?
        })
    }
}

fn read_mirror(db_path: &Path, query: &str, code: &str) -> Result<Vec<RawFiling>, SourceError> {
    let connection = open_read_only(db_path).map_err(|error| {
        SourceError::transient(format!(
            "failed to open mirror '{}': {error}",
            db_path.display()
        ))
    })?;

    let mut statement = connection
        .prepare(query)
        .map_err(|error| SourceError::transient(format!("mirror query failed: {error}")))?;
    let rows = statement
        .query_map([code], |row| {
            Ok(RawFiling {
                filing_number: row.get(0)?,
                filing_date: row.get(1)?,
                debtor_name: row.get(2)?,
                secured_party_name: row.get(3)?,
                jurisdiction: row.get(4)?,
                lien_amount: row.get::<_, Option<f64>>(5)?.map(RawAmount::Number),
                status: row.get(6)?,
                filing_type: row.get(7)?,
            })
        })
        .map_err(|error| SourceError::transient(format!("mirror query failed: {error}")))?;

    let filings = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| SourceError::transient(format!("mirror row read failed: {error}")))?;
    tracing::debug!(
        mirror = %db_path.display(),
        jurisdiction = code,
        rows = filings.len(),
        "read filings from mirror"
    );
    Ok(filings)
}

fn open_read_only(db_path: &Path) -> Result<Connection, ::duckdb::Error> {
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Connection::open_with_flags(db_path, config)
}

fn select_sql(table: &str) -> String {
    format!(
        "SELECT CAST(filing_number AS VARCHAR), CAST(filing_date AS VARCHAR), \
         CAST(debtor_name AS VARCHAR), CAST(secured_party_name AS VARCHAR), \
         CAST(jurisdiction AS VARCHAR), CAST(lien_amount AS DOUBLE), \
         CAST(status AS VARCHAR), CAST(filing_type AS VARCHAR) \
         FROM {table} \
         WHERE upper(trim(CAST(jurisdiction AS VARCHAR))) = ? \
         ORDER BY filing_date, filing_number"
    )
}

/// `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`.
fn is_table_identifier(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        })
}

#[cfg(test)]
mod tests {
    use lienwatch_core::SourceErrorKind;

    use super::*;

    fn seed_mirror(path: &Path) {
        let connection = Connection::open(path).expect("opens mirror");
        connection
            .execute_batch(
                "CREATE TABLE ucc_filings (
                    filing_number VARCHAR,
                    filing_date DATE,
                    debtor_name VARCHAR,
                    secured_party_name VARCHAR,
                    jurisdiction VARCHAR,
                    lien_amount DECIMAL(14, 2),
                    status VARCHAR,
                    filing_type VARCHAR
                );
                INSERT INTO ucc_filings VALUES
                    ('TX-100', DATE '2019-04-02', 'Lone Star Feed', 'First Bank', 'TX', 12500.00, 'lapsed', 'ucc1'),
                    ('TX-101', DATE '2023-01-15', 'Bluebonnet LLC', 'Credit Union', 'tx', NULL, 'active', 'ucc1'),
                    ('CA-900', DATE '2020-07-07', 'Golden Gate Co', 'Pacific Bank', 'CA', 5000.00, 'active', 'ucc3');",
            )
            .expect("seeds mirror");
    }

    #[tokio::test]
    async fn reads_only_the_requested_jurisdiction() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("mirror.duckdb");
        seed_mirror(&path);

        let adapter = MirrorAdapter::new("tx-mirror", &path, DEFAULT_MIRROR_TABLE).expect("valid");
        let texas = Jurisdiction::parse("TX").expect("valid");
        let rows = adapter.fetch(&texas).await.expect("reads");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filing_number.as_deref(), Some("TX-100"));
        assert_eq!(rows[0].filing_date.as_deref(), Some("2019-04-02"));
        assert_eq!(rows[0].lien_amount, Some(RawAmount::Number(12_500.0)));
        assert_eq!(rows[1].lien_amount, None);
    }

    #[tokio::test]
    async fn missing_mirror_file_is_transient() {
        let dir = tempfile::tempdir().expect("temp dir");
        let adapter = MirrorAdapter::new("gone", dir.path().join("absent.duckdb"), "ucc_filings")
            .expect("valid");

        let err = adapter
            .fetch(&Jurisdiction::parse("TX").expect("valid"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Transient);
    }

    #[test]
    fn from_config_requires_path_and_checks_table() {
        let config = SourceConfig::new("mirror", SourceKind::Database, 10);
        assert!(matches!(
            MirrorAdapter::from_config(&config),
            Err(ConfigError::MissingConnectionParam { key: "path", .. })
        ));

        let config = config
            .with_param("path", "/tmp/mirror.duckdb")
            .with_param("mirror_table", "filings; DROP TABLE x");
        assert!(matches!(
            MirrorAdapter::from_config(&config),
            Err(ConfigError::InvalidConnectionParam { key: "mirror_table", .. })
        ));
    }

    #[test]
    fn accepts_schema_qualified_tables() {
        assert!(is_table_identifier("main.ucc_filings"));
        assert!(is_table_identifier("_staging"));
        assert!(!is_table_identifier("1table"));
        assert!(!is_table_identifier("a.b.c"));
        assert!(!is_table_identifier(""));
    }
}
