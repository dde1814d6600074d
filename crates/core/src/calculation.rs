use serde::Serialize;

use crate::ids::{CalculationId, UserId};
use crate::operation::Operation;

/// The operation and operand that derive a child from its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivation {
    pub parent_id: CalculationId,
    pub operation: Operation,
    pub operand: f64,
}

/// A calculation about to be persisted. Roots carry no derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    pub user_id: UserId,
    pub value: f64,
    pub derivation: Option<Derivation>,
}

impl NewCalculation {
    pub fn root(user_id: UserId, value: f64) -> Self {
        Self { user_id, value, derivation: None }
    }

    pub fn child(user_id: UserId, value: f64, derivation: Derivation) -> Self {
        Self { user_id, value, derivation: Some(derivation) }
    }
}

/// A persisted calculation as the store returns it.
///
/// `parent_id`, `operation` and `operand` are either all set or all `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub id: CalculationId,
    pub user_id: UserId,
    pub parent_id: Option<CalculationId>,
    pub value: f64,
    pub operation: Option<Operation>,
    pub operand: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl CalculationRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn derivation(&self) -> Option<Derivation> {
        match (self.parent_id, self.operation, self.operand) {
            (Some(parent_id), Some(operation), Some(operand)) => Some(Derivation {
                parent_id,
                operation,
                operand,
            }),
            _ => None,
        }
    }
}

/// A calculation joined with its creator's username.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationView {
    #[serde(flatten)]
    pub record: CalculationRecord,
    pub username: String,
}

impl CalculationView {
    pub fn new(record: CalculationRecord, username: impl Into<String>) -> Self {
        Self { record, username: username.into() }
    }

    pub fn id(&self) -> CalculationId {
        self.record.id
    }

    pub fn value(&self) -> f64 {
        self.record.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub created_at: i64,
}

/// Anything that can be placed in a calculation tree.
pub trait TreeRecord {
    fn id(&self) -> CalculationId;
    fn parent_id(&self) -> Option<CalculationId>;
}

impl TreeRecord for CalculationRecord {
    fn id(&self) -> CalculationId {
        self.id
    }

    fn parent_id(&self) -> Option<CalculationId> {
        self.parent_id
    }
}

impl TreeRecord for CalculationView {
    fn id(&self) -> CalculationId {
        self.record.id
    }

    fn parent_id(&self) -> Option<CalculationId> {
        self.record.parent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, parent: Option<i64>) -> CalculationRecord {
        CalculationRecord {
            id: CalculationId::new(id),
            user_id: UserId::new(1),
            parent_id: parent.map(CalculationId::new),
            value: 15.0,
            operation: parent.map(|_| Operation::Add),
            operand: parent.map(|_| 5.0),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn derivation_present_only_for_children() {
        assert!(record(1, None).derivation().is_none());
        let d = record(2, Some(1)).derivation().unwrap();
        assert_eq!(d.parent_id, CalculationId::new(1));
        assert_eq!(d.operation, Operation::Add);
        assert_eq!(d.operand, 5.0);
    }

    #[test]
    fn view_serializes_flat_in_camel_case() {
        let view = CalculationView::new(record(2, Some(1)), "alice");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["userId"], 1);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["parentId"], 1);
        assert_eq!(json["operation"], "+");
        assert_eq!(json["operand"], 5.0);
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn root_serializes_nulls() {
        let json = serde_json::to_value(CalculationView::new(record(1, None), "bob")).unwrap();
        assert!(json["parentId"].is_null());
        assert!(json["operation"].is_null());
        assert!(json["operand"].is_null());
    }
}
