pub mod calculation;
pub mod error;
pub mod ids;
pub mod operation;
pub mod resolver;
pub mod tree;

pub use calculation::{
    CalculationRecord, CalculationView, Derivation, NewCalculation, TreeRecord, UserRecord,
};
pub use error::CoreError;
pub use ids::*;
pub use operation::{Operation, apply_symbol, require_finite};
pub use resolver::{DEFAULT_MAX_DEPTH, resolve_root};
pub use tree::{Forest, TreeNode, build_forest, build_tree, flatten_preorder};
