use calctree_core::{
    CalculationId, CalculationRecord, CalculationView, NewCalculation, UserRecord,
};

use crate::error::StorageError;

/// The record store the calculation service reads from and appends to.
pub trait CalculationStore {
    fn fetch_by_id(&self, id: CalculationId) -> Result<Option<CalculationRecord>, StorageError>;

    /// Like `fetch_by_id`, joined with the creator's username.
    fn fetch_view_by_id(&self, id: CalculationId) -> Result<Option<CalculationView>, StorageError>;

    /// Direct children, oldest first.
    fn fetch_children(
        &self,
        parent_id: CalculationId,
    ) -> Result<Vec<CalculationRecord>, StorageError>;

    /// Roots, newest first.
    fn fetch_roots(&self) -> Result<Vec<CalculationRecord>, StorageError>;

    /// Every calculation with its username, oldest first.
    fn fetch_all_with_usernames(&self) -> Result<Vec<CalculationView>, StorageError>;

    /// `root_id` and all of its descendants, shallowest first.
    fn fetch_subtree(&self, root_id: CalculationId) -> Result<Vec<CalculationView>, StorageError>;

    fn insert(&mut self, calculation: &NewCalculation) -> Result<CalculationRecord, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;

    fn insert_user(&mut self, username: &str) -> Result<UserRecord, StorageError>;

    fn fetch_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StorageError>;
}
