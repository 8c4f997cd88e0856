//! Session abstraction.
//!
//! A [`Session`] is one pooled connection with one open transaction. It is
//! the scope of every temporary table: tables created through a session are
//! visible only to it and are gone once it commits, rolls back or is dropped.

use async_trait::async_trait;

use crate::dialect::{Dialect, TempTableScope};
use crate::error::{SessionError, StorageError, StorageResult};
use crate::sql::{drop_table, RenderedSql, Renderer, SqlRow, Statement};

/// A single connection with an open transaction.
///
/// # Dropping
///
/// Dropping a session without calling [`commit`](Session::commit) or
/// [`rollback`](Session::rollback) rolls the transaction back and releases
/// its temporary tables. Backends do this synchronously where the driver
/// allows it and otherwise hand it to the pool's connection reset.
#[async_trait]
pub trait Session: Send {
    /// Returns the dialect of the underlying connection.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Returns the session bookkeeping.
    fn state(&self) -> &SessionState;

    /// Returns the session bookkeeping mutably.
    fn state_mut(&mut self) -> &mut SessionState;

    /// Returns true until the session is committed or rolled back.
    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Executes a statement and returns the driver-reported affected row count.
    async fn execute(&mut self, sql: &RenderedSql) -> StorageResult<u64>;

    /// Executes a query and decodes each row by its declared column types.
    async fn query(&mut self, sql: &RenderedSql) -> StorageResult<Vec<SqlRow>>;

    /// Opens a new transaction after the dialect implicitly committed the previous one.
    async fn begin(&mut self) -> StorageResult<()>;

    /// Commits the transaction and releases temporary tables.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls the transaction back and releases temporary tables.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Renders and executes a statement.
    async fn execute_statement(&mut self, statement: &Statement) -> StorageResult<u64> {
        let rendered = Renderer::render(statement, self.dialect())?;
        self.execute(&rendered).await
    }

    /// Renders and runs a query.
    async fn query_statement(&mut self, statement: &Statement) -> StorageResult<Vec<SqlRow>> {
        let rendered = Renderer::render(statement, self.dialect())?;
        self.query(&rendered).await
    }

    /// Returns true if the session already holds a relation with this name.
    fn has_relation(&self, name: &str) -> bool {
        self.state().has_temporary_table(name)
    }

    /// Records a temporary table for teardown when the session ends.
    fn register_temporary_table(&mut self, name: &str) {
        self.state_mut().register_temporary_table(name);
    }
}

/// Bookkeeping shared by all session implementations.
#[derive(Debug, Clone)]
pub struct SessionState {
    active: bool,
    temporary_tables: Vec<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates the state of a freshly opened session.
    pub fn new() -> Self {
        Self {
            active: true,
            temporary_tables: Vec::new(),
        }
    }

    /// Returns true until the session ends.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fails with [`SessionError::Inactive`] once the session has ended.
    pub fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::Session(SessionError::Inactive))
        }
    }

    /// Marks the session as ended.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Returns the temporary tables created in this session, oldest first.
    pub fn temporary_tables(&self) -> &[String] {
        &self.temporary_tables
    }

    /// Returns true if a temporary table with this name was created here.
    pub fn has_temporary_table(&self, name: &str) -> bool {
        self.temporary_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Records a temporary table.
    pub fn register_temporary_table(&mut self, name: &str) {
        if !self.has_temporary_table(name) {
            self.temporary_tables.push(name.to_string());
        }
    }

    /// Takes the statements that release connection-scoped temporary tables.
    ///
    /// Transaction-scoped tables are dropped by the engine, so nothing is
    /// returned for them.
    pub fn take_teardown(&mut self, dialect: &dyn Dialect) -> Vec<RenderedSql> {
        let tables = std::mem::take(&mut self.temporary_tables);
        if dialect.temporary_table_scope() == TempTableScope::Transaction {
            return Vec::new();
        }
        tables
            .iter()
            .rev()
            .filter_map(|name| {
                Renderer::render(&drop_table(name.as_str()).temporary().into(), dialect).ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    #[test]
    fn test_state_lifecycle() {
        let mut state = SessionState::new();
        assert!(state.is_active());
        assert!(state.ensure_active().is_ok());
        state.deactivate();
        assert!(matches!(
            state.ensure_active(),
            Err(StorageError::Session(SessionError::Inactive))
        ));
    }

    #[test]
    fn test_register_is_case_insensitive_and_unique() {
        let mut state = SessionState::new();
        state.register_temporary_table("staged_a");
        state.register_temporary_table("STAGED_A");
        assert_eq!(state.temporary_tables().len(), 1);
        assert!(state.has_temporary_table("Staged_A"));
    }

    #[test]
    fn test_teardown_per_scope() {
        let mut state = SessionState::new();
        state.register_temporary_table("a");
        state.register_temporary_table("b");
        let drops = state.take_teardown(DialectKind::WeakRowCount.adapter());
        let sql: Vec<_> = drops.iter().map(|d| d.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "DROP TEMPORARY TABLE IF EXISTS `b`",
                "DROP TEMPORARY TABLE IF EXISTS `a`"
            ]
        );
        assert!(state.temporary_tables().is_empty());

        let mut state = SessionState::new();
        state.register_temporary_table("a");
        assert!(state.take_teardown(DialectKind::Strict.adapter()).is_empty());
    }
}
