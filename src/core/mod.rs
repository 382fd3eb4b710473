//! Core types shared by every layer of the library
//!
//! - Keys and human-readable symbols identifying variables
//! - Keyed vector collections used for points, steps and multipliers
//! - Variable → factor indices

pub mod key;
pub mod values;
pub mod variable_index;

pub use key::{Key, Symbol};
pub use values::VectorValues;
pub use variable_index::VariableIndex;
