//! Versioned schema migrator.
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction whose last statement stamps the step's version, so a
//! failed step leaves neither its DDL nor its version behind.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, info, warn};

use fieldsafe_core::config::TransactionMode;
use fieldsafe_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

/// DDL bringing the schema to `to_version`.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub to_version: i32,
    pub statements: &'static [&'static str],
}

#[derive(diesel::QueryableByName)]
struct UserVersionRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    user_version: i32,
}

pub struct Migrator<'a> {
    steps: &'a [MigrationStep],
    target_version: i32,
}

impl<'a> Migrator<'a> {
    pub fn new(steps: &'a [MigrationStep], target_version: i32) -> Self {
        Self {
            steps,
            target_version,
        }
    }

    /// Apply every step above the recorded version in ascending order and
    /// return the final recorded version.
    pub fn run(&self, conn: &mut SqliteConnection, mode: TransactionMode) -> Result<i32> {
        let current = read_version(conn)?;

        let mut pending: Vec<&MigrationStep> = self
            .steps
            .iter()
            .filter(|step| step.to_version > current)
            .collect();
        pending.sort_by_key(|step| step.to_version);

        for step in pending {
            info!(
                "[Migrator] Applying schema v{} ({} statements)",
                step.to_version,
                step.statements.len()
            );
            let applied = match mode {
                TransactionMode::Exclusive => apply_exclusive(conn, step),
                TransactionMode::Manual => apply_manual(conn, step),
            };
            applied.map_err(|err| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "schema v{}: {}",
                    step.to_version, err
                )))
            })?;
        }

        let recorded = read_version(conn)?;
        if recorded != self.target_version {
            if recorded > self.target_version {
                warn!(
                    "[Migrator] Recorded schema v{} is ahead of target v{}",
                    recorded, self.target_version
                );
            }
            debug!("[Migrator] Stamping schema v{}", self.target_version);
            stamp_version(conn, self.target_version).map_err(StorageError::from)?;
        }

        Ok(self.target_version)
    }
}

pub fn read_version(conn: &mut SqliteConnection) -> Result<i32> {
    let row = diesel::sql_query("PRAGMA user_version")
        .get_result::<UserVersionRow>(conn)
        .map_err(StorageError::from)?;
    Ok(row.user_version)
}

fn stamp_version(conn: &mut SqliteConnection, version: i32) -> QueryResult<()> {
    conn.batch_execute(&format!("PRAGMA user_version = {version};"))
}

fn execute_step(conn: &mut SqliteConnection, step: &MigrationStep) -> QueryResult<()> {
    for statement in step.statements {
        conn.batch_execute(statement)?;
    }
    stamp_version(conn, step.to_version)
}

fn apply_exclusive(
    conn: &mut SqliteConnection,
    step: &MigrationStep,
) -> std::result::Result<(), StorageError> {
    conn.exclusive_transaction::<_, StorageError, _>(|tx| {
        execute_step(tx, step).map_err(StorageError::from)
    })
}

/// Explicit BEGIN/COMMIT. A failed statement is followed by ROLLBACK; a
/// failing ROLLBACK is logged and the original error is returned.
fn apply_manual(
    conn: &mut SqliteConnection,
    step: &MigrationStep,
) -> std::result::Result<(), StorageError> {
    conn.batch_execute("BEGIN EXCLUSIVE;")?;
    let result = execute_step(conn, step).and_then(|_| conn.batch_execute("COMMIT;"));
    if let Err(err) = result {
        if let Err(rollback_err) = conn.batch_execute("ROLLBACK;") {
            warn!("[Migrator] Rollback failed: {}", rollback_err);
        }
        return Err(StorageError::from(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STEPS: &[MigrationStep] = &[
        MigrationStep {
            to_version: 1,
            statements: &["CREATE TABLE alpha (id TEXT PRIMARY KEY NOT NULL)"],
        },
        MigrationStep {
            to_version: 2,
            statements: &["CREATE TABLE beta (id TEXT PRIMARY KEY NOT NULL)"],
        },
    ];

    const BROKEN: &[MigrationStep] = &[
        MigrationStep {
            to_version: 1,
            statements: &["CREATE TABLE alpha (id TEXT PRIMARY KEY NOT NULL)"],
        },
        MigrationStep {
            to_version: 2,
            statements: &[
                "CREATE TABLE gamma (id TEXT PRIMARY KEY NOT NULL)",
                "INSERT INTO missing_table (id) VALUES ('x')",
            ],
        },
    ];

    fn open(dir: &tempfile::TempDir) -> SqliteConnection {
        let path = dir.path().join("migrate.db");
        SqliteConnection::establish(&path.to_string_lossy()).expect("open db")
    }

    #[derive(diesel::QueryableByName)]
    struct CountRow {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        c: i64,
    }

    fn table_exists(conn: &mut SqliteConnection, name: &str) -> bool {
        diesel::sql_query(format!(
            "SELECT COUNT(*) AS c FROM sqlite_master WHERE type = 'table' AND name = '{name}'"
        ))
        .get_result::<CountRow>(conn)
        .expect("count")
        .c
            == 1
    }

    #[test]
    fn applies_steps_in_order_and_is_idempotent() {
        for mode in [TransactionMode::Exclusive, TransactionMode::Manual] {
            let dir = tempdir().expect("tempdir");
            let mut conn = open(&dir);

            // Out-of-order input is sorted by version.
            let shuffled = [STEPS[1], STEPS[0]];
            let migrator = Migrator::new(&shuffled, 2);
            assert_eq!(migrator.run(&mut conn, mode).expect("migrate"), 2);
            assert_eq!(read_version(&mut conn).expect("version"), 2);
            assert!(table_exists(&mut conn, "alpha"));
            assert!(table_exists(&mut conn, "beta"));

            assert_eq!(migrator.run(&mut conn, mode).expect("rerun"), 2);
        }
    }

    #[test]
    fn failed_step_rolls_back_its_ddl_and_version() {
        for mode in [TransactionMode::Exclusive, TransactionMode::Manual] {
            let dir = tempdir().expect("tempdir");
            let mut conn = open(&dir);

            let result = Migrator::new(BROKEN, 2).run(&mut conn, mode);
            assert!(matches!(
                result,
                Err(Error::Database(DatabaseError::MigrationFailed(_)))
            ));
            assert_eq!(read_version(&mut conn).expect("version"), 1);
            assert!(table_exists(&mut conn, "alpha"));
            assert!(!table_exists(&mut conn, "gamma"));
        }
    }

    #[test]
    fn uninitialized_version_is_force_stamped() {
        let dir = tempdir().expect("tempdir");
        let mut conn = open(&dir);

        assert_eq!(read_version(&mut conn).expect("version"), 0);
        Migrator::new(&[], 3)
            .run(&mut conn, TransactionMode::Exclusive)
            .expect("migrate");
        assert_eq!(read_version(&mut conn).expect("version"), 3);
    }
}
