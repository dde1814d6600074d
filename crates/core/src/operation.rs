//! Arithmetic engine: the four operations a child may apply to its parent's value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "*" => Ok(Self::Multiply),
            "/" => Ok(Self::Divide),
            _ => Err(CoreError::InvalidOperation(s.to_string())),
        }
    }

    /// Compute a child's value from its parent's value.
    ///
    /// Division by zero is rejected up front rather than detected from an
    /// infinite result, so `-0.0` is rejected too.
    pub fn apply(&self, parent_value: f64, operand: f64) -> Result<f64, CoreError> {
        match self {
            Self::Add => Ok(parent_value + operand),
            Self::Subtract => Ok(parent_value - operand),
            Self::Multiply => Ok(parent_value * operand),
            Self::Divide => {
                if operand == 0.0 {
                    return Err(CoreError::DivisionByZero);
                }
                Ok(parent_value / operand)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Apply an operation given by its raw symbol.
pub fn apply_symbol(symbol: &str, parent_value: f64, operand: f64) -> Result<f64, CoreError> {
    Operation::parse(symbol)?.apply(parent_value, operand)
}

/// Reject NaN and infinities before they reach the store.
pub fn require_finite(label: &str, n: f64) -> Result<f64, CoreError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(CoreError::InvalidNumber(format!("{label} must be finite, got {n}")))
    }
}
