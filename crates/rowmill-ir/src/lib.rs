//! # rowmill-ir
//!
//! The computation-tree representation used by the rowmill engine.
//!
//! A tree is built from matrix literals at the leaves and four operators
//! above them: n-ary element-wise addition, n-ary matrix multiplication,
//! unary negation, and unary transposition. The evaluator normalizes n-ary
//! operators into left-associative binary chains, then repeatedly collapses
//! the deepest node whose children are all literals until the root itself is
//! one.
//!
//! Trees travel as JSON: a bare 2-D array for a literal, or
//! `{"operator", "operands"}` objects for the four operators. See
//! [`parse_tree`] and [`to_json_string`].

mod error;
mod node;
mod serialization;

pub use error::IrError;
pub use node::ComputationNode;
pub use serialization::{parse_tree, parse_tree_from_reader, to_json_string};
