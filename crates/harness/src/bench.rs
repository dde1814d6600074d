use std::path::{Path, PathBuf};

use calctree_core::{CalculationId, UserId};
use calctree_engine::CalculationService;
use calctree_storage::{SqliteStore, schema};
use tempfile::TempDir;

type BenchResult<T> = Result<T, Box<dyn std::error::Error>>;

/// A calculation service over a throwaway SQLite store with one registered
/// user, plus helpers for building trees and corrupting the store on purpose.
pub struct TestBench {
    pub service: CalculationService<SqliteStore>,
    pub user: UserId,
    dir: Option<(TempDir, PathBuf)>,
}

impl TestBench {
    pub fn new() -> BenchResult<Self> {
        let mut service = CalculationService::new(SqliteStore::open_in_memory()?);
        let user = service.register_user("tester")?.id;
        Ok(Self { service, user, dir: None })
    }

    /// Same as `new`, but backed by a file that survives `reopen`.
    pub fn on_disk() -> BenchResult<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join("calctree.db");
        let mut service = CalculationService::new(SqliteStore::open(&path)?);
        let user = service.register_user("tester")?.id;
        Ok(Self { service, user, dir: Some((dir, path)) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(|(_, path)| path.as_path())
    }

    /// Close the store and open the same file again.
    pub fn reopen(self) -> BenchResult<Self> {
        let Self { service, user, dir } = self;
        let Some((dir, path)) = dir else {
            return Err("in-memory bench cannot be reopened".into());
        };
        drop(service);
        let service = CalculationService::new(SqliteStore::open(&path)?);
        Ok(Self { service, user, dir: Some((dir, path)) })
    }

    pub fn add_user(&mut self, username: &str) -> BenchResult<UserId> {
        Ok(self.service.register_user(username)?.id)
    }

    pub fn root(&mut self, value: f64) -> BenchResult<CalculationId> {
        Ok(self.service.create_root(self.user, value)?.id())
    }

    pub fn apply(
        &mut self,
        parent: CalculationId,
        operation: &str,
        operand: f64,
    ) -> BenchResult<CalculationId> {
        Ok(self
            .service
            .add_operation(self.user, parent, operation, operand)?
            .id())
    }

    /// Apply each step to the result of the previous one. Returns the new ids.
    pub fn chain(
        &mut self,
        start: CalculationId,
        steps: &[(&str, f64)],
    ) -> BenchResult<Vec<CalculationId>> {
        let mut ids = Vec::with_capacity(steps.len());
        let mut parent = start;
        for &(operation, operand) in steps {
            parent = self.apply(parent, operation, operand)?;
            ids.push(parent);
        }
        Ok(ids)
    }

    /// Remove a record behind the service's back, leaving its children with a
    /// dangling parent reference.
    pub fn break_link(&mut self, id: CalculationId) -> BenchResult<()> {
        let conn = self.service.store().conn();
        conn.execute_batch(
            "PRAGMA foreign_keys = OFF;
             DROP TRIGGER IF EXISTS calculations_no_delete;",
        )?;
        conn.execute("DELETE FROM calculations WHERE id = ?1", [id.get()])?;
        schema::init_schema(conn)?;
        Ok(())
    }

    /// Insert a child whose parent id does not exist.
    pub fn insert_orphan(&mut self, missing_parent: CalculationId) -> BenchResult<CalculationId> {
        let conn = self.service.store().conn();
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        conn.execute(
            "INSERT INTO calculations (user_id, parent_id, value, operation, operand)
             VALUES (?1, ?2, '1', '+', '1')",
            [self.user.get(), missing_parent.get()],
        )?;
        let id = CalculationId::new(conn.last_insert_rowid());
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(id)
    }
}
