//! The parallel evaluator.
//!
//! [`LinearAlgebraEngine`] resolves a computation tree bottom-up. Each round
//! it picks the deepest node whose children are all literals, stages the
//! operand matrices into two long-lived shared slots (`left` doubles as the
//! destination), fans the operator out into one task per result row, runs
//! the batch through the fatigue executor's barrier, and writes the result
//! back into the tree. The loop ends when the root itself is a literal.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use rowmill_ir::ComputationNode;
use rowmill_mem::{MemError, SharedMatrix};
use rowmill_sched::{ExecutorConfig, Task, TiredExecutor, WorkerReport};

use crate::error::EngineError;

/// First row-task failure of one operator batch. Dimensions are validated
/// before any task is generated, so this is a backstop, not a control path.
type FailureSlot = Arc<Mutex<Option<MemError>>>;

/// Evaluates computation trees over a fatigue-aware worker pool.
pub struct LinearAlgebraEngine {
    left: Arc<SharedMatrix>,
    right: Arc<SharedMatrix>,
    executor: TiredExecutor,
}

impl LinearAlgebraEngine {
    /// Creates an engine backed by `threads` workers.
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        Ok(Self::from_executor(TiredExecutor::new(threads)?))
    }

    /// Creates an engine with an explicit executor configuration.
    pub fn with_config(config: ExecutorConfig) -> Result<Self, EngineError> {
        Ok(Self::from_executor(TiredExecutor::with_config(config)?))
    }

    fn from_executor(executor: TiredExecutor) -> Self {
        LinearAlgebraEngine {
            left: Arc::new(SharedMatrix::new()),
            right: Arc::new(SharedMatrix::new()),
            executor,
        }
    }

    /// Formatted snapshot of the pool, for diagnostics.
    pub fn worker_report(&self) -> WorkerReport {
        self.executor.worker_report()
    }

    /// Runs the tree to completion and returns it with the root collapsed
    /// into a literal. The worker pool is shut down on every exit path,
    /// error or not, before this returns.
    pub fn run(mut self, mut root: ComputationNode) -> Result<ComputationNode, EngineError> {
        let outcome = self.evaluate(&mut root);
        self.executor.shutdown();
        outcome.map(|()| root)
    }

    fn evaluate(&mut self, root: &mut ComputationNode) -> Result<(), EngineError> {
        if root.is_literal() {
            return Ok(());
        }
        root.associative_nesting();

        while !root.is_literal() {
            let node = match root.find_resolvable() {
                Some(node) => node,
                None => return Err(EngineError::NoResolvableNode),
            };
            self.load_and_compute(node)?;
            let result = self.left.read_row_major();
            node.resolve(result);
        }
        Ok(())
    }

    /// Stages `node`'s operands into the shared slots, generates the row
    /// tasks, and runs them to the barrier. Afterwards the result sits in
    /// the left slot.
    fn load_and_compute(&mut self, node: &ComputationNode) -> Result<(), EngineError> {
        let (tasks, failure) = match node {
            ComputationNode::Add(operands) => {
                let (left, right) = binary_operands("+", operands)?;
                if shape(left) != shape(right) {
                    return Err(dimension_mismatch("+", left, right));
                }
                self.left.load_row_major(left)?;
                self.right.load_row_major(right)?;
                self.add_tasks()?
            }
            ComputationNode::Multiply(operands) => {
                let (left, right) = binary_operands("*", operands)?;
                if shape(left).1 != shape(right).0 {
                    return Err(dimension_mismatch("*", left, right));
                }
                self.left.load_row_major(left)?;
                self.right.load_column_major(right)?;
                self.multiply_tasks()?
            }
            ComputationNode::Negate(operand) => {
                self.left.load_row_major(literal_of(operand)?)?;
                self.negate_tasks()?
            }
            ComputationNode::Transpose(operand) => {
                self.left.load_row_major(literal_of(operand)?)?;
                self.transpose_tasks()?
            }
            ComputationNode::Literal(_) => return Err(EngineError::ComputeOnLiteral),
        };

        self.executor.submit_all(tasks)?;
        let outcome = failure.lock().take();
        match outcome {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// One task per row: `left[i] += right[i]`.
    fn add_tasks(&self) -> Result<(Vec<Task>, FailureSlot), EngineError> {
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let dst = self.left.get(i)?;
            let src = self.right.get(i)?;
            let failure = Arc::clone(&failure);
            tasks.push(Box::new(move || {
                if let Err(err) = dst.add(&src) {
                    failure.lock().get_or_insert(err);
                }
            }));
        }
        Ok((tasks, failure))
    }

    /// One task per row: `left[i] = left[i] × right`, with the right matrix
    /// staged column-major so each task reads columns for its dot products.
    fn multiply_tasks(&self) -> Result<(Vec<Task>, FailureSlot), EngineError> {
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let row = self.left.get(i)?;
            let right = Arc::clone(&self.right);
            let failure = Arc::clone(&failure);
            tasks.push(Box::new(move || {
                if let Err(err) = row.vec_mat_mul(&right) {
                    failure.lock().get_or_insert(err);
                }
            }));
        }
        Ok((tasks, failure))
    }

    /// One task per row: `left[i] = -left[i]`.
    fn negate_tasks(&self) -> Result<(Vec<Task>, FailureSlot), EngineError> {
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let row = self.left.get(i)?;
            tasks.push(Box::new(move || row.negate()));
        }
        Ok((tasks, failure))
    }

    /// Transposition with a last-finisher install.
    ///
    /// Task `c` reads column `c` of the staged input into its own private
    /// output row, so the tasks never contend on a data lock. A shared
    /// counter tracks how many tasks remain; the task that observes zero
    /// under the counter lock installs the assembled result into the left
    /// slot. No task ever waits on another task, so the protocol also works
    /// on a single-worker pool.
    fn transpose_tasks(&self) -> Result<(Vec<Task>, FailureSlot), EngineError> {
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let input_rows = self.left.len();
        if input_rows == 0 {
            // Transposing an empty matrix: the staged input already is the
            // result.
            return Ok((Vec::new(), failure));
        }
        let input_cols = self.left.get(0)?.len();
        if input_cols == 0 {
            // An n x 0 input transposes to 0 x n; install directly.
            self.left.load_row_major(&[])?;
            return Ok((Vec::new(), failure));
        }

        // Capture the input row vectors before the left slot is overwritten;
        // they stay alive until the last task releases them.
        let mut inputs = Vec::with_capacity(input_rows);
        for i in 0..input_rows {
            inputs.push(self.left.get(i)?);
        }
        let inputs = Arc::new(inputs);

        let buffer: Arc<Vec<Mutex<Vec<f64>>>> = Arc::new(
            (0..input_cols)
                .map(|_| Mutex::new(vec![0.0; input_rows]))
                .collect(),
        );
        let remaining = Arc::new(Mutex::new(input_cols));

        let mut tasks: Vec<Task> = Vec::with_capacity(input_cols);
        for col in 0..input_cols {
            let inputs = Arc::clone(&inputs);
            let buffer = Arc::clone(&buffer);
            let remaining = Arc::clone(&remaining);
            let destination = Arc::clone(&self.left);
            let failure = Arc::clone(&failure);
            tasks.push(Box::new(move || {
                let mut outcome = Ok(());
                {
                    let mut row = buffer[col].lock();
                    for (i, input) in inputs.iter().enumerate() {
                        match input.get(col) {
                            Ok(value) => row[i] = value,
                            Err(err) => {
                                outcome = Err(err);
                                break;
                            }
                        }
                    }
                }
                if let Err(err) = outcome {
                    failure.lock().get_or_insert(err);
                }

                let mut remaining = remaining.lock();
                *remaining -= 1;
                if *remaining == 0 {
                    // Last task standing: every other task has published its
                    // row (row-lock release happens-before this counter
                    // observation), so assembling and installing here is
                    // race-free.
                    let rows: Vec<Vec<f64>> = buffer
                        .iter()
                        .map(|row| mem::take(&mut *row.lock()))
                        .collect();
                    if let Err(err) = destination.load_row_major(&rows) {
                        failure.lock().get_or_insert(err);
                    }
                }
            }));
        }
        Ok((tasks, failure))
    }
}

fn binary_operands<'a>(
    operator: &'static str,
    operands: &'a [ComputationNode],
) -> Result<(&'a Vec<Vec<f64>>, &'a Vec<Vec<f64>>), EngineError> {
    match operands {
        [left, right] => Ok((literal_of(left)?, literal_of(right)?)),
        _ => Err(EngineError::OperandCount {
            operator,
            expected: "exactly 2",
            actual: operands.len(),
        }),
    }
}

fn literal_of(node: &ComputationNode) -> Result<&Vec<Vec<f64>>, EngineError> {
    node.as_literal().ok_or(EngineError::UnresolvedOperand)
}

fn shape(matrix: &[Vec<f64>]) -> (usize, usize) {
    (matrix.len(), matrix.first().map_or(0, Vec::len))
}

fn dimension_mismatch(
    operator: &'static str,
    left: &[Vec<f64>],
    right: &[Vec<f64>],
) -> EngineError {
    let (left_rows, left_cols) = shape(left);
    let (right_rows, right_cols) = shape(right);
    EngineError::DimensionMismatch {
        operator,
        left_rows,
        left_cols,
        right_rows,
        right_cols,
    }
}
