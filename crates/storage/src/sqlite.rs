use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use calctree_core::{
    CalculationId, CalculationRecord, CalculationView, NewCalculation, Operation, UserId,
    UserRecord,
};

use crate::error::StorageError;
use crate::traits::CalculationStore;

const RECORD_COLUMNS: &str =
    "c.id, c.user_id, c.parent_id, c.value, c.operation, c.operand, c.created_at";

/// Store decimals as the shortest string that parses back to the same f64.
fn format_decimal(n: f64) -> String {
    n.to_string()
}

fn parse_decimal(s: &str, label: &str) -> Result<f64, StorageError> {
    s.parse::<f64>()
        .map_err(|e| StorageError::Serialization(format!("invalid {label} {s:?}: {e}")))
}

/// Map a constraint failure to a readable error, pass everything else through.
fn constraint_error(e: rusqlite::Error, what: &str) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(format!(
                "{what}: {}",
                msg.unwrap_or_else(|| "constraint failed".to_string())
            ))
        }
        other => StorageError::Sqlite(other),
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        debug!(path = %path.display(), "opened calculation store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CalculationRecord>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, raw_record)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }

    fn query_views(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CalculationView>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            let raw = raw_record(row)?;
            let username: String = row.get(7)?;
            Ok((raw, username))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (raw, username) = row?;
            result.push(CalculationView::new(raw.into_record()?, username));
        }
        Ok(result)
    }
}

/// Column values as SQLite hands them back, before decimal parsing.
struct RawRecord {
    id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    value: String,
    operation: Option<String>,
    operand: Option<String>,
    created_at: i64,
}

fn raw_record(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        parent_id: row.get(2)?,
        value: row.get(3)?,
        operation: row.get(4)?,
        operand: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<CalculationRecord, StorageError> {
        let operation = self.operation.as_deref().map(Operation::parse).transpose()?;
        let operand = self
            .operand
            .as_deref()
            .map(|s| parse_decimal(s, "operand"))
            .transpose()?;
        Ok(CalculationRecord {
            id: CalculationId::new(self.id),
            user_id: UserId::new(self.user_id),
            parent_id: self.parent_id.map(CalculationId::new),
            value: parse_decimal(&self.value, "value")?,
            operation,
            operand,
            created_at: self.created_at,
        })
    }
}

fn read_user(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl CalculationStore for SqliteStore {
    fn fetch_by_id(&self, id: CalculationId) -> Result<Option<CalculationRecord>, StorageError> {
        let mut records = self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM calculations c WHERE c.id = ?1"),
            rusqlite::params![id.get()],
        )?;
        Ok(records.pop())
    }

    fn fetch_view_by_id(&self, id: CalculationId) -> Result<Option<CalculationView>, StorageError> {
        let mut views = self.query_views(
            &format!(
                "SELECT {RECORD_COLUMNS}, u.username FROM calculations c
                 JOIN users u ON u.id = c.user_id
                 WHERE c.id = ?1"
            ),
            rusqlite::params![id.get()],
        )?;
        Ok(views.pop())
    }

    fn fetch_children(
        &self,
        parent_id: CalculationId,
    ) -> Result<Vec<CalculationRecord>, StorageError> {
        let records = self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM calculations c
                 WHERE c.parent_id = ?1
                 ORDER BY c.created_at, c.id"
            ),
            rusqlite::params![parent_id.get()],
        )?;
        debug!(parent = %parent_id, rows = records.len(), "fetched children");
        Ok(records)
    }

    fn fetch_roots(&self) -> Result<Vec<CalculationRecord>, StorageError> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM calculations c
                 WHERE c.parent_id IS NULL
                 ORDER BY c.created_at DESC, c.id DESC"
            ),
            rusqlite::params![],
        )
    }

    fn fetch_all_with_usernames(&self) -> Result<Vec<CalculationView>, StorageError> {
        let views = self.query_views(
            &format!(
                "SELECT {RECORD_COLUMNS}, u.username FROM calculations c
                 JOIN users u ON u.id = c.user_id
                 ORDER BY c.created_at, c.id"
            ),
            rusqlite::params![],
        )?;
        debug!(rows = views.len(), "fetched all calculations");
        Ok(views)
    }

    fn fetch_subtree(&self, root_id: CalculationId) -> Result<Vec<CalculationView>, StorageError> {
        let views = self.query_views(
            &format!(
                "WITH RECURSIVE tree (id, depth) AS (
                     SELECT id, 0 FROM calculations WHERE id = ?1
                     UNION ALL
                     SELECT c.id, t.depth + 1 FROM calculations c
                     JOIN tree t ON c.parent_id = t.id
                 )
                 SELECT {RECORD_COLUMNS}, u.username FROM tree t
                 JOIN calculations c ON c.id = t.id
                 JOIN users u ON u.id = c.user_id
                 ORDER BY t.depth, c.created_at, c.id"
            ),
            rusqlite::params![root_id.get()],
        )?;
        debug!(root = %root_id, rows = views.len(), "fetched subtree");
        Ok(views)
    }

    fn insert(&mut self, calculation: &NewCalculation) -> Result<CalculationRecord, StorageError> {
        let derivation = calculation.derivation;
        let raw = self
            .conn
            .query_row(
                "INSERT INTO calculations (user_id, parent_id, value, operation, operand)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, user_id, parent_id, value, operation, operand, created_at",
                rusqlite::params![
                    calculation.user_id.get(),
                    derivation.map(|d| d.parent_id.get()),
                    format_decimal(calculation.value),
                    derivation.map(|d| d.operation.symbol()),
                    derivation.map(|d| format_decimal(d.operand)),
                ],
                raw_record,
            )
            .map_err(|e| constraint_error(e, "insert calculation"))?;
        let record = raw.into_record()?;
        debug!(
            id = %record.id,
            user = %record.user_id,
            parent = ?record.parent_id.map(|p| p.get()),
            value = record.value,
            "inserted calculation"
        );
        Ok(record)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM calculations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn insert_user(&mut self, username: &str) -> Result<UserRecord, StorageError> {
        let result = self.conn.query_row(
            "INSERT INTO users (username) VALUES (?1) RETURNING id, username, created_at",
            rusqlite::params![username],
            read_user,
        );
        match result {
            Ok(user) => {
                debug!(id = %user.id, username = %user.username, "inserted user");
                Ok(user)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StorageError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(constraint_error(e, "insert user")),
        }
    }

    fn fetch_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                rusqlite::params![username],
                read_user,
            )
            .optional()?;
        Ok(user)
    }
}
