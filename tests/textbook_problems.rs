//! End-to-end solves of small QPs with known solutions.

use apex_qp::{
    GaussianFactorGraph, HessianFactor, JacobianFactor, Key, LinearEquality, LinearInequality,
    LinearSolverType, QP, QpError, QpSolver, QpSolverConfig, Symbol, VectorValues,
};
use nalgebra::{dmatrix, dvector};

const TOLERANCE: f64 = 1e-7;

fn x(i: u64) -> Key {
    Symbol::new('x', i).key()
}

fn dual(i: u64) -> Key {
    Symbol::new('l', i).key()
}

fn point(a: f64, b: f64) -> VectorValues {
    [(x(1), dvector![a]), (x(2), dvector![b])].into_iter().collect()
}

fn planar_inequality(a1: f64, a2: f64, b: f64, index: u64) -> LinearInequality {
    LinearInequality::new(vec![(x(1), dvector![a1]), (x(2), dvector![a2])], b, dual(index)).unwrap()
}

fn assert_close(values: &VectorValues, key: Key, expected: f64) {
    let actual = values.at(key).unwrap()[0];
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "{} = {actual}, expected {expected}",
        Symbol::from_key(key)
    );
}

/// Nocedal & Wright, Example 16.4
///
/// minimize (x1 − 1)² + (x2 − 2.5)², scaled by ½ here
fn nocedal_example() -> QP {
    let mut cost = GaussianFactorGraph::new();
    cost.push(
        JacobianFactor::new(
            vec![(x(1), dmatrix![1.0; 0.0]), (x(2), dmatrix![0.0; 1.0])],
            dvector![1.0, 2.5],
        )
        .unwrap(),
    );
    let inequalities = vec![
        planar_inequality(-1.0, 2.0, 2.0, 0),
        planar_inequality(1.0, 2.0, 6.0, 1),
        planar_inequality(1.0, -2.0, 2.0, 2),
        planar_inequality(-1.0, 0.0, 0.0, 3),
        planar_inequality(0.0, -1.0, 0.0, 4),
    ];
    QP::new(cost, vec![], inequalities).unwrap()
}

/// minimize x1² − x1x2 + x2² − 3x1 + 5
/// subject to x1 + x2 ≤ 2, x1 ≥ 0, x2 ≥ 0, x1 ≤ 1.5
fn coupled_example() -> QP {
    let mut cost = GaussianFactorGraph::new();
    cost.push(
        HessianFactor::binary(
            x(1),
            x(2),
            dmatrix![2.0],
            dmatrix![-1.0],
            dmatrix![2.0],
            dvector![3.0],
            dvector![0.0],
            10.0,
        )
        .unwrap(),
    );
    let inequalities = vec![
        planar_inequality(1.0, 1.0, 2.0, 0),
        planar_inequality(-1.0, 0.0, 0.0, 1),
        planar_inequality(0.0, -1.0, 0.0, 2),
        planar_inequality(1.0, 0.0, 1.5, 3),
    ];
    QP::new(cost, vec![], inequalities).unwrap()
}

#[test]
fn test_nocedal_example_16_4() {
    let solver = QpSolver::new(nocedal_example());
    let (values, duals) = solver.optimize(&point(2.0, 0.0)).unwrap();

    assert_close(&values, x(1), 1.4);
    assert_close(&values, x(2), 1.7);
    // only −x1 + 2x2 ≤ 2 binds at the solution
    assert_close(&duals, dual(0), -0.4);
    for index in 1..5 {
        assert!(!duals.contains(dual(index)));
    }
}

#[test]
fn test_nocedal_example_with_qr() {
    let config = QpSolverConfig::new().with_linear_solver_type(LinearSolverType::SparseQR);
    let solver = QpSolver::with_config(nocedal_example(), config);
    let (values, duals) = solver.optimize(&point(2.0, 0.0)).unwrap();

    assert_close(&values, x(1), 1.4);
    assert_close(&values, x(2), 1.7);
    assert_close(&duals, dual(0), -0.4);
}

#[test]
fn test_coupled_hessian() {
    let qp = coupled_example();
    let solver = QpSolver::new(qp.clone());
    let (values, duals) = solver.optimize(&point(0.0, 0.0)).unwrap();

    assert_close(&values, x(1), 1.5);
    assert_close(&values, x(2), 0.5);
    assert_close(&duals, dual(0), -0.5);
    // 2.25 − 0.75 + 0.25 − 4.5 + 5
    assert!((qp.cost(&values).unwrap() - 2.25).abs() < TOLERANCE);
}

#[test]
fn test_equality_and_inequality() {
    // minimize ½(x1² + x2²) subject to x1 + x2 = 1, x1 ≤ 0.2
    let mut cost = GaussianFactorGraph::new();
    cost.push(JacobianFactor::new(vec![(x(1), dmatrix![1.0])], dvector![0.0]).unwrap());
    cost.push(JacobianFactor::new(vec![(x(2), dmatrix![1.0])], dvector![0.0]).unwrap());
    let multiplier = Symbol::new('m', 0).key();
    let equality = LinearEquality::new(
        vec![(x(1), dmatrix![1.0]), (x(2), dmatrix![1.0])],
        dvector![1.0],
        multiplier,
    )
    .unwrap();
    let qp = QP::new(cost, vec![equality], vec![planar_inequality(1.0, 0.0, 0.2, 0)]).unwrap();

    let (values, duals) = QpSolver::new(qp).optimize(&point(0.0, 1.0)).unwrap();
    assert_close(&values, x(1), 0.2);
    assert_close(&values, x(2), 0.8);
    assert_close(&duals, multiplier, 0.8);
    assert_close(&duals, dual(0), -0.6);
}

#[test]
fn test_equality_only() {
    // minimize ½‖x − (1, 2, 3)‖² subject to x1 + x2 + x3 = 0, x1 − x3 = 0
    let x3 = Symbol::new('x', 3).key();
    let mut cost = GaussianFactorGraph::new();
    for (key, target) in [(x(1), 1.0), (x(2), 2.0), (x3, 3.0)] {
        cost.push(JacobianFactor::new(vec![(key, dmatrix![1.0])], dvector![target]).unwrap());
    }
    let multiplier = Symbol::new('m', 0).key();
    let equality = LinearEquality::new(
        vec![
            (x(1), dmatrix![1.0; 1.0]),
            (x(2), dmatrix![1.0; 0.0]),
            (x3, dmatrix![1.0; -1.0]),
        ],
        dvector![0.0, 0.0],
        multiplier,
    )
    .unwrap();
    let qp = QP::new(cost, vec![equality], vec![]).unwrap();

    let mut initial = point(0.0, 0.0);
    initial.insert(x3, dvector![0.0]);
    let (values, duals) = QpSolver::new(qp).optimize(&initial).unwrap();

    // x1 = x3 = t, x2 = −2t; minimizing gives t = 0
    assert_close(&values, x(1), 0.0);
    assert_close(&values, x(2), 0.0);
    assert_close(&values, x3, 0.0);
    assert_eq!(duals.at(multiplier).unwrap().len(), 2);
}

#[test]
fn test_vector_valued_variable() {
    // minimize ½‖p − (3, 3)‖² subject to p₁ + p₂ ≤ 2, with p ∈ ℝ²
    let p = Symbol::new('p', 0).key();
    let mut cost = GaussianFactorGraph::new();
    cost.push(JacobianFactor::new(vec![(p, dmatrix![1.0, 0.0; 0.0, 1.0])], dvector![3.0, 3.0]).unwrap());
    let bound = LinearInequality::new(vec![(p, dvector![1.0, 1.0])], 2.0, dual(0)).unwrap();
    let qp = QP::new(cost, vec![], vec![bound]).unwrap();

    let initial: VectorValues = [(p, dvector![0.0, 0.0])].into_iter().collect();
    let (values, duals) = QpSolver::new(qp).optimize(&initial).unwrap();

    let solution = values.at(p).unwrap();
    assert!((solution[0] - 1.0).abs() < TOLERANCE);
    assert!((solution[1] - 1.0).abs() < TOLERANCE);
    assert_close(&duals, dual(0), -2.0);
}

#[test]
fn test_infeasible_start_is_rejected() {
    let solver = QpSolver::new(nocedal_example());
    // violates x1 − 2x2 ≤ 2
    let result = solver.optimize(&point(5.0, 0.0));
    assert!(matches!(
        result,
        Err(QpError::InfeasibleInitialValues { constraint: 2, .. })
    ));
}

#[test]
fn test_feasibility_and_monotone_cost_every_iteration() {
    for (qp, initial) in [
        (nocedal_example(), point(2.0, 0.0)),
        (coupled_example(), point(0.0, 0.0)),
    ] {
        let solver = QpSolver::new(qp.clone());
        let mut state = solver.initial_state(&initial, &VectorValues::new(), false).unwrap();
        let mut cost = qp.cost(&state.values).unwrap();

        while !state.converged {
            state = solver.iterate(&state).unwrap();
            assert!(state.iterations < 50);

            assert!(qp.is_feasible(&state.values, TOLERANCE).unwrap());
            for (_, inequality) in state.working_set.active() {
                assert!(inequality.violation(&state.values).unwrap().abs() < TOLERANCE);
            }

            let next = qp.cost(&state.values).unwrap();
            assert!(next <= cost + 1e-12, "cost increased from {cost} to {next}");
            cost = next;
        }

        // at a KKT point no active multiplier is positive
        for (_, inequality) in state.working_set.active() {
            assert!(state.duals.at(inequality.dual_key()).unwrap()[0] <= 0.0);
        }
    }
}
