//! End-to-end evaluation scenarios.

use approx::assert_relative_eq;
use rowmill_engine::{EngineError, LinearAlgebraEngine};
use rowmill_ir::{parse_tree, ComputationNode};
use rowmill_sched::{ExecutorConfig, FatiguePolicy};

fn evaluate(threads: usize, source: &str) -> Result<Vec<Vec<f64>>, EngineError> {
    let tree = parse_tree(source).expect("test source must parse");
    let engine = LinearAlgebraEngine::new(threads)?;
    let resolved = engine.run(tree)?;
    Ok(resolved.as_literal().expect("root must be a literal").clone())
}

#[test]
fn literal_passthrough() {
    let result = evaluate(2, "[[1, 2], [3, 4]]").unwrap();
    assert_eq!(result, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
}

#[test]
fn add_two_matrices() {
    let result = evaluate(
        3,
        r#"{"operator": "+", "operands": [[[1, 2], [3, 4]], [[10, 20], [30, 40]]]}"#,
    )
    .unwrap();
    assert_eq!(result, vec![vec![11.0, 22.0], vec![33.0, 44.0]]);
}

#[test]
fn multiply_two_matrices() {
    let result = evaluate(
        4,
        r#"{"operator": "*", "operands": [[[1, 2, 3], [4, 5, 6]], [[7, 8], [9, 10], [11, 12]]]}"#,
    )
    .unwrap();
    assert_eq!(result, vec![vec![58.0, 64.0], vec![139.0, 154.0]]);
}

#[test]
fn negate_a_matrix() {
    let result = evaluate(2, r#"{"operator": "-", "operands": [[[1, -2], [3, 0]]]}"#).unwrap();
    assert_eq!(result, vec![vec![-1.0, 2.0], vec![-3.0, -0.0]]);
}

#[test]
fn transpose_on_a_single_worker_pool() {
    // One worker forces the last-finisher install path to run on the same
    // worker that executed every column task.
    let result = evaluate(1, r#"{"operator": "T", "operands": [[[1, 2, 3], [4, 5, 6]]]}"#).unwrap();
    assert_eq!(
        result,
        vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]
    );
}

#[test]
fn transpose_on_a_wide_pool() {
    let result = evaluate(4, r#"{"operator": "T", "operands": [[[1, 2, 3], [4, 5, 6]]]}"#).unwrap();
    assert_eq!(
        result,
        vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]
    );
}

#[test]
fn nary_add_is_left_associative() {
    let result = evaluate(
        3,
        r#"{"operator": "+", "operands": [[[1, 1], [1, 1]], [[2, 2], [2, 2]], [[3, 3], [3, 3]]]}"#,
    )
    .unwrap();
    assert_eq!(result, vec![vec![6.0, 6.0], vec![6.0, 6.0]]);
}

#[test]
fn nary_multiply_chains_left_to_right() {
    // (A * B) * C with incompatible alternative groupings ruled out by
    // shape: 1x2 * 2x3 * 3x1 = 1x1.
    let result = evaluate(
        2,
        r#"{"operator": "*", "operands": [[[1, 2]], [[1, 0, 1], [0, 1, 1]], [[1], [1], [1]]]}"#,
    )
    .unwrap();
    assert_eq!(result, vec![vec![6.0]]);
}

#[test]
fn nested_mixed_operators() {
    // T(-(A + B)) * C
    let source = r#"
        {"operator": "*", "operands": [
            {"operator": "T", "operands": [
                {"operator": "-", "operands": [
                    {"operator": "+", "operands": [[[1, 2]], [[3, 4]]]}
                ]}
            ]},
            [[2, 0]]
        ]}
    "#;
    let result = evaluate(3, source).unwrap();
    assert_eq!(result, vec![vec![-8.0, 0.0], vec![-12.0, 0.0]]);
}

#[test]
fn add_dimension_mismatch_is_reported() {
    let err = evaluate(2, r#"{"operator": "+", "operands": [[[1, 2]], [[1, 2], [3, 4]]]}"#);
    assert!(matches!(
        err,
        Err(EngineError::DimensionMismatch { operator: "+", .. })
    ));
}

#[test]
fn multiply_dimension_mismatch_is_reported() {
    let err = evaluate(2, r#"{"operator": "*", "operands": [[[1, 2]], [[1, 2]]]}"#);
    assert!(matches!(
        err,
        Err(EngineError::DimensionMismatch { operator: "*", .. })
    ));
}

#[test]
fn mismatch_deep_in_the_tree_aborts_evaluation() {
    let source = r#"
        {"operator": "+", "operands": [
            [[1]],
            {"operator": "*", "operands": [[[1, 2]], [[1, 2]]]}
        ]}
    "#;
    assert!(evaluate(2, source).is_err());
}

#[test]
fn nan_propagates_through_arithmetic() {
    let tree = ComputationNode::add(vec![
        ComputationNode::literal(vec![vec![f64::NAN, 1.0]]),
        ComputationNode::literal(vec![vec![2.0, 3.0]]),
    ]);
    let engine = LinearAlgebraEngine::new(2).unwrap();
    let resolved = engine.run(tree).unwrap();
    let result = resolved.as_literal().unwrap();
    assert!(result[0][0].is_nan());
    assert_relative_eq!(result[0][1], 4.0);
}

#[test]
fn infinities_follow_ieee_rules() {
    let tree = ComputationNode::multiply(vec![
        ComputationNode::literal(vec![vec![f64::INFINITY, 1.0]]),
        ComputationNode::literal(vec![vec![2.0], vec![0.0]]),
    ]);
    let engine = LinearAlgebraEngine::new(2).unwrap();
    let resolved = engine.run(tree).unwrap();
    let result = resolved.as_literal().unwrap();
    assert_eq!(result[0][0], f64::INFINITY);
}

#[test]
fn single_operand_add_is_an_arity_error() {
    let tree = ComputationNode::Add(vec![ComputationNode::literal(vec![vec![1.0]])]);
    let engine = LinearAlgebraEngine::new(2).unwrap();
    assert!(matches!(
        engine.run(tree),
        Err(EngineError::OperandCount {
            operator: "+",
            actual: 1,
            ..
        })
    ));
}

#[test]
fn deterministic_pool_configuration_works_end_to_end() {
    let config = ExecutorConfig::new(2).with_fatigue(FatiguePolicy::Fixed(vec![0.6, 1.2]));
    let engine = LinearAlgebraEngine::with_config(config).unwrap();
    let report = engine.worker_report().to_string();
    assert_eq!(report.matches("factor=").count(), 2);

    let tree = parse_tree(r#"{"operator": "+", "operands": [[[1]], [[2]]]}"#).unwrap();
    let resolved = engine.run(tree).unwrap();
    assert_eq!(resolved.as_literal().unwrap(), &vec![vec![3.0]]);
}

#[test]
fn empty_matrix_passthrough_and_transpose() {
    assert_eq!(evaluate(2, "[]").unwrap(), Vec::<Vec<f64>>::new());
    assert_eq!(
        evaluate(2, r#"{"operator": "T", "operands": [[]]}"#).unwrap(),
        Vec::<Vec<f64>>::new()
    );
}

#[test]
fn tall_inputs_spread_across_many_workers() {
    let rows = 64;
    let a: Vec<Vec<f64>> = (0..rows).map(|r| vec![r as f64; 8]).collect();
    let b: Vec<Vec<f64>> = (0..rows).map(|_| vec![1.0; 8]).collect();
    let tree = ComputationNode::add(vec![
        ComputationNode::literal(a.clone()),
        ComputationNode::literal(b),
    ]);
    let engine = LinearAlgebraEngine::new(8).unwrap();
    let resolved = engine.run(tree).unwrap();
    let result = resolved.as_literal().unwrap();
    for (r, row) in result.iter().enumerate() {
        assert!(row.iter().all(|&v| v == r as f64 + 1.0));
    }
}
