pub mod config;
pub mod error;

pub use config::ServiceConfig;
pub use error::{EngineError, ErrorKind};

use calctree_core::{
    CalculationId, CalculationRecord, CalculationView, Derivation, Forest, NewCalculation,
    Operation, TreeNode, UserId, UserRecord, build_forest, build_tree, require_finite,
    resolve_root,
};
use calctree_storage::CalculationStore;

/// A calculation with its descendants nested beneath it.
pub type CalculationTree = TreeNode<CalculationView>;

/// Creates calculations and answers tree queries against a record store.
///
/// Holds no state beyond the store handle; every call builds its own lookup
/// structures and drops them when it returns.
pub struct CalculationService<S> {
    store: S,
    config: ServiceConfig,
}

impl<S: CalculationStore> CalculationService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub fn register_user(&mut self, username: &str) -> Result<UserRecord, EngineError> {
        Ok(self.store.insert_user(username)?)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, EngineError> {
        Ok(self.store.fetch_user_by_name(username)?)
    }

    pub fn require_user(&self, username: &str) -> Result<UserRecord, EngineError> {
        self.find_user(username)?
            .ok_or_else(|| EngineError::UserNotFound(username.to_string()))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Start a new tree from a user-supplied number.
    pub fn create_root(&mut self, user_id: UserId, value: f64) -> Result<CalculationView, EngineError> {
        let value = require_finite("value", value)?;
        let record = self.store.insert(&NewCalculation::root(user_id, value))?;
        self.denormalize(record)
    }

    /// Derive a child from `parent_id` by applying `operation` with `operand`.
    ///
    /// The child's value is computed here, once, and stored; nothing is
    /// persisted if the parent is missing or the arithmetic is rejected.
    pub fn add_operation(
        &mut self,
        user_id: UserId,
        parent_id: CalculationId,
        operation: &str,
        operand: f64,
    ) -> Result<CalculationView, EngineError> {
        let parent = self
            .store
            .fetch_by_id(parent_id)?
            .ok_or(EngineError::ParentNotFound(parent_id))?;

        let operation = Operation::parse(operation)?;
        let operand = require_finite("operand", operand)?;
        let value = operation.apply(parent.value, operand)?;

        let derivation = Derivation { parent_id: parent.id, operation, operand };
        let record = self
            .store
            .insert(&NewCalculation::child(user_id, value, derivation))?;
        self.denormalize(record)
    }

    /// Re-read a fresh record joined with its username. Falls back to an
    /// empty username if the join finds nothing.
    fn denormalize(&self, record: CalculationRecord) -> Result<CalculationView, EngineError> {
        match self.store.fetch_view_by_id(record.id)? {
            Some(view) => Ok(view),
            None => Ok(CalculationView::new(record, String::new())),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The whole tree containing `id`, from its root down.
    ///
    /// `None` if `id` does not exist. If the ancestor chain is broken the
    /// highest reachable ancestor stands in for the root.
    pub fn get_tree(&self, id: CalculationId) -> Result<Option<CalculationTree>, EngineError> {
        let root_id = resolve_root(id, self.config.max_depth, |id| {
            self.store.fetch_by_id(id).map_err(EngineError::from)
        })?;
        let Some(root_id) = root_id else {
            return Ok(None);
        };

        let records = self.store.fetch_subtree(root_id)?;
        Ok(build_tree(root_id, records))
    }

    /// Every tree in the store, roots in creation order.
    pub fn get_all_trees(&self) -> Result<Vec<CalculationTree>, EngineError> {
        Ok(self.all_forest()?.into_trees())
    }

    /// The assembled forest before nesting, for callers that want to inspect
    /// what was left out.
    pub fn all_forest(&self) -> Result<Forest<CalculationView>, EngineError> {
        let records = self.store.fetch_all_with_usernames()?;
        Ok(build_forest(records))
    }

    pub fn get_calculation(&self, id: CalculationId) -> Result<Option<CalculationView>, EngineError> {
        Ok(self.store.fetch_view_by_id(id)?)
    }

    pub fn children(&self, id: CalculationId) -> Result<Vec<CalculationRecord>, EngineError> {
        Ok(self.store.fetch_children(id)?)
    }

    pub fn calculation_count(&self) -> Result<u64, EngineError> {
        Ok(self.store.count()?)
    }
}
