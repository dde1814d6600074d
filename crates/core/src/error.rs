use thiserror::Error;

use crate::ids::CalculationId;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("division by zero is not allowed")]
    DivisionByZero,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("corrupt tree: ancestor chain from {start} exceeded {steps} steps")]
    CorruptTree { start: CalculationId, steps: usize },
}
