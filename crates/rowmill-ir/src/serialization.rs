//! JSON wire format for computation trees.
//!
//! A document is either a bare 2-D number array (a literal matrix) or an
//! operator object `{"operator": "+"|"*"|"-"|"T", "operands": [...]}` whose
//! operands are themselves documents. `+` and `*` take at least two
//! operands, `-` and `T` exactly one.

use std::io;

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::node::ComputationNode;

/// Untagged wire representation. Conversion into [`ComputationNode`]
/// performs operator and arity validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawNode {
    Literal(Vec<Vec<f64>>),
    Operator {
        operator: String,
        operands: Vec<RawNode>,
    },
}

impl TryFrom<RawNode> for ComputationNode {
    type Error = IrError;

    fn try_from(raw: RawNode) -> Result<Self, IrError> {
        match raw {
            RawNode::Literal(rows) => {
                validate_literal(&rows)?;
                Ok(ComputationNode::Literal(rows))
            }
            RawNode::Operator { operator, operands } => {
                let arity = operands.len();
                let operands: Vec<ComputationNode> = operands
                    .into_iter()
                    .map(ComputationNode::try_from)
                    .collect::<Result<_, _>>()?;
                match operator.as_str() {
                    "+" | "*" => {
                        if arity < 2 {
                            return Err(IrError::OperandCount {
                                operator,
                                expected: "at least 2",
                                actual: arity,
                            });
                        }
                        Ok(if operator == "+" {
                            ComputationNode::Add(operands)
                        } else {
                            ComputationNode::Multiply(operands)
                        })
                    }
                    "-" | "T" => {
                        let mut operands = operands.into_iter();
                        match (operands.next(), operands.next()) {
                            (Some(only), None) => Ok(if operator == "-" {
                                ComputationNode::negate(only)
                            } else {
                                ComputationNode::transpose(only)
                            }),
                            _ => Err(IrError::OperandCount {
                                operator,
                                expected: "exactly 1",
                                actual: arity,
                            }),
                        }
                    }
                    _ => Err(IrError::UnknownOperator(operator)),
                }
            }
        }
    }
}

impl From<ComputationNode> for RawNode {
    fn from(node: ComputationNode) -> RawNode {
        let (operator, operands) = match node {
            ComputationNode::Literal(rows) => return RawNode::Literal(rows),
            ComputationNode::Add(operands) => ("+", operands),
            ComputationNode::Multiply(operands) => ("*", operands),
            ComputationNode::Negate(operand) => ("-", vec![*operand]),
            ComputationNode::Transpose(operand) => ("T", vec![*operand]),
        };
        RawNode::Operator {
            operator: operator.to_string(),
            operands: operands.into_iter().map(RawNode::from).collect(),
        }
    }
}

fn validate_literal(rows: &[Vec<f64>]) -> Result<(), IrError> {
    let expected = rows.first().map_or(0, Vec::len);
    for (row, data) in rows.iter().enumerate().skip(1) {
        if data.len() != expected {
            return Err(IrError::RaggedLiteral {
                row,
                expected,
                actual: data.len(),
            });
        }
    }
    Ok(())
}

/// Parses a computation tree from a JSON string.
pub fn parse_tree(input: &str) -> Result<ComputationNode, IrError> {
    Ok(serde_json::from_str(input)?)
}

/// Parses a computation tree from a reader.
pub fn parse_tree_from_reader<R: io::Read>(reader: R) -> Result<ComputationNode, IrError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Serializes a tree back to its wire form.
pub fn to_json_string(node: &ComputationNode) -> Result<String, IrError> {
    Ok(serde_json::to_string(node)?)
}
