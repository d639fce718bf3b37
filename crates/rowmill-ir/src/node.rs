//! Computation nodes in the expression tree.

use serde::{Deserialize, Serialize};

use crate::serialization::RawNode;

/// One node of a matrix computation tree: either a literal matrix or an
/// operator over child subtrees.
///
/// Addition and multiplication are n-ary as parsed; the evaluator first
/// calls [`ComputationNode::associative_nesting`] so that every numerical
/// kernel only ever sees two operands. Negation and transposition are unary
/// by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum ComputationNode {
    Literal(Vec<Vec<f64>>),
    Add(Vec<ComputationNode>),
    Multiply(Vec<ComputationNode>),
    Negate(Box<ComputationNode>),
    Transpose(Box<ComputationNode>),
}

impl ComputationNode {
    pub fn literal(rows: Vec<Vec<f64>>) -> Self {
        ComputationNode::Literal(rows)
    }

    pub fn add(operands: Vec<ComputationNode>) -> Self {
        ComputationNode::Add(operands)
    }

    pub fn multiply(operands: Vec<ComputationNode>) -> Self {
        ComputationNode::Multiply(operands)
    }

    pub fn negate(operand: ComputationNode) -> Self {
        ComputationNode::Negate(Box::new(operand))
    }

    pub fn transpose(operand: ComputationNode) -> Self {
        ComputationNode::Transpose(Box::new(operand))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ComputationNode::Literal(_))
    }

    /// The literal matrix carried by this node, if it is one.
    pub fn as_literal(&self) -> Option<&Vec<Vec<f64>>> {
        match self {
            ComputationNode::Literal(rows) => Some(rows),
            _ => None,
        }
    }

    /// The wire-format name of this node's operator.
    pub fn operator_name(&self) -> Option<&'static str> {
        match self {
            ComputationNode::Literal(_) => None,
            ComputationNode::Add(_) => Some("+"),
            ComputationNode::Multiply(_) => Some("*"),
            ComputationNode::Negate(_) => Some("-"),
            ComputationNode::Transpose(_) => Some("T"),
        }
    }

    /// Child subtrees; `None` for literals.
    pub fn operands(&self) -> Option<&[ComputationNode]> {
        match self {
            ComputationNode::Literal(_) => None,
            ComputationNode::Add(operands) | ComputationNode::Multiply(operands) => {
                Some(operands)
            }
            ComputationNode::Negate(operand) | ComputationNode::Transpose(operand) => {
                Some(std::slice::from_ref(operand))
            }
        }
    }

    fn operands_mut(&mut self) -> Option<&mut [ComputationNode]> {
        match self {
            ComputationNode::Literal(_) => None,
            ComputationNode::Add(operands) | ComputationNode::Multiply(operands) => {
                Some(operands)
            }
            ComputationNode::Negate(operand) | ComputationNode::Transpose(operand) => {
                Some(std::slice::from_mut(operand))
            }
        }
    }

    /// An operator node is ready when every child is a literal.
    pub fn is_ready(&self) -> bool {
        match self.operands() {
            Some(operands) => operands.iter().all(ComputationNode::is_literal),
            None => false,
        }
    }

    /// Rewrites every operator of arity greater than two into a
    /// left-associative chain of binary nodes: `op(a,b,c,d)` becomes
    /// `op(op(op(a,b),c),d)`. Applied recursively; unary operators and
    /// already-binary nodes are left alone.
    pub fn associative_nesting(&mut self) {
        match self {
            ComputationNode::Literal(_) => {}
            ComputationNode::Negate(operand) | ComputationNode::Transpose(operand) => {
                operand.associative_nesting();
            }
            ComputationNode::Add(operands) => {
                for operand in operands.iter_mut() {
                    operand.associative_nesting();
                }
                if operands.len() > 2 {
                    *self = left_nest(std::mem::take(operands), ComputationNode::Add);
                }
            }
            ComputationNode::Multiply(operands) => {
                for operand in operands.iter_mut() {
                    operand.associative_nesting();
                }
                if operands.len() > 2 {
                    *self = left_nest(std::mem::take(operands), ComputationNode::Multiply);
                }
            }
        }
    }

    /// Depth-first, left-to-right search for the first node whose children
    /// are all literals. Returns `None` only when this node itself is a
    /// literal.
    pub fn find_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_literal() {
            return None;
        }
        if self.is_ready() {
            return Some(self);
        }
        if let Some(operands) = self.operands_mut() {
            for operand in operands {
                if let Some(found) = operand.find_resolvable() {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Collapses this node into a literal carrying `matrix`, discarding any
    /// children.
    pub fn resolve(&mut self, matrix: Vec<Vec<f64>>) {
        *self = ComputationNode::Literal(matrix);
    }
}

fn left_nest(
    operands: Vec<ComputationNode>,
    make: fn(Vec<ComputationNode>) -> ComputationNode,
) -> ComputationNode {
    let mut iter = operands.into_iter();
    let Some(first) = iter.next() else {
        return make(Vec::new());
    };
    let Some(second) = iter.next() else {
        return make(vec![first]);
    };
    let mut acc = make(vec![first, second]);
    for next in iter {
        acc = make(vec![acc, next]);
    }
    acc
}
