use std::time::Instant;

use apex_qp::{
    GaussianFactorGraph, HessianFactor, JacobianFactor, LinearEquality, LinearInequality,
    LinearSolverType, QP, QpResult, QpSolver, QpSolverConfig, Symbol, VectorValues,
    init_logger_with_level,
};
use clap::Parser;
use nalgebra::{dmatrix, dvector};
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "qp_demo")]
#[command(about = "Solve textbook quadratic programs with the active-set QP solver")]
struct Args {
    /// Problem to solve: "bound", "coupled", "nocedal", "equality", or "all"
    #[arg(short, long, default_value = "all")]
    problem: String,

    /// Linear solver for unconstrained subproblems: "cholesky" or "qr"
    #[arg(short, long, default_value = "cholesky")]
    linear_solver: String,

    /// Maximum number of active-set iterations
    #[arg(short, long, default_value = "1000")]
    max_iterations: usize,

    /// Log every active-set iteration
    #[arg(short, long)]
    verbose: bool,
}

struct Demo {
    name: &'static str,
    description: &'static str,
    qp: QP,
    initial: VectorValues,
}

fn x(i: u64) -> u64 {
    Symbol::new('x', i).key()
}

fn dual(i: u64) -> u64 {
    Symbol::new('l', i).key()
}

fn point(entries: &[f64]) -> VectorValues {
    entries
        .iter()
        .enumerate()
        .map(|(i, v)| (x(i as u64 + 1), dvector![*v]))
        .collect()
}

/// `a·x ≤ b` over scalar variables x1, x2, ...
fn inequality(coefficients: &[f64], b: f64, index: u64) -> QpResult<LinearInequality> {
    let terms = coefficients
        .iter()
        .enumerate()
        .filter(|(_, a)| **a != 0.0)
        .map(|(i, a)| (x(i as u64 + 1), dvector![*a]))
        .collect();
    LinearInequality::new(terms, b, dual(index))
}

/// minimize ½(x1 − 10)² subject to x1 ≤ 5
fn bound_demo() -> QpResult<Demo> {
    let mut cost = GaussianFactorGraph::new();
    cost.push(JacobianFactor::new(vec![(x(1), dmatrix![1.0])], dvector![10.0])?);
    Ok(Demo {
        name: "bound",
        description: "min ½(x1 − 10)²  s.t.  x1 ≤ 5",
        qp: QP::new(cost, vec![], vec![inequality(&[1.0], 5.0, 0)?])?,
        initial: point(&[0.0]),
    })
}

/// minimize x1² − x1x2 + x2² − 3x1 + 5 over a clipped triangle
fn coupled_demo() -> QpResult<Demo> {
    let mut cost = GaussianFactorGraph::new();
    cost.push(HessianFactor::binary(
        x(1),
        x(2),
        dmatrix![2.0],
        dmatrix![-1.0],
        dmatrix![2.0],
        dvector![3.0],
        dvector![0.0],
        10.0,
    )?);
    let inequalities = vec![
        inequality(&[1.0, 1.0], 2.0, 0)?,
        inequality(&[-1.0, 0.0], 0.0, 1)?,
        inequality(&[0.0, -1.0], 0.0, 2)?,
        inequality(&[1.0, 0.0], 1.5, 3)?,
    ];
    Ok(Demo {
        name: "coupled",
        description: "min x1² − x1x2 + x2² − 3x1 + 5  s.t.  x1 + x2 ≤ 2, x ≥ 0, x1 ≤ 1.5",
        qp: QP::new(cost, vec![], inequalities)?,
        initial: point(&[0.0, 0.0]),
    })
}

/// Nocedal & Wright, Example 16.4
fn nocedal_demo() -> QpResult<Demo> {
    let mut cost = GaussianFactorGraph::new();
    cost.push(JacobianFactor::new(
        vec![(x(1), dmatrix![1.0; 0.0]), (x(2), dmatrix![0.0; 1.0])],
        dvector![1.0, 2.5],
    )?);
    let inequalities = vec![
        inequality(&[-1.0, 2.0], 2.0, 0)?,
        inequality(&[1.0, 2.0], 6.0, 1)?,
        inequality(&[1.0, -2.0], 2.0, 2)?,
        inequality(&[-1.0, 0.0], 0.0, 3)?,
        inequality(&[0.0, -1.0], 0.0, 4)?,
    ];
    Ok(Demo {
        name: "nocedal",
        description: "Nocedal & Wright Example 16.4, started at (2, 0)",
        qp: QP::new(cost, vec![], inequalities)?,
        initial: point(&[2.0, 0.0]),
    })
}

/// minimize ½(x1² + x2²) subject to x1 + x2 = 1 and x1 ≤ 0.2
fn equality_demo() -> QpResult<Demo> {
    let mut cost = GaussianFactorGraph::new();
    cost.push(JacobianFactor::new(vec![(x(1), dmatrix![1.0])], dvector![0.0])?);
    cost.push(JacobianFactor::new(vec![(x(2), dmatrix![1.0])], dvector![0.0])?);
    let equality = LinearEquality::new(
        vec![(x(1), dmatrix![1.0]), (x(2), dmatrix![1.0])],
        dvector![1.0],
        Symbol::new('m', 0).key(),
    )?;
    Ok(Demo {
        name: "equality",
        description: "min ½(x1² + x2²)  s.t.  x1 + x2 = 1, x1 ≤ 0.2",
        qp: QP::new(cost, vec![equality], vec![inequality(&[1.0, 0.0], 0.2, 0)?])?,
        initial: point(&[0.0, 1.0]),
    })
}

fn run_demo(demo: &Demo, config: QpSolverConfig) -> QpResult<()> {
    println!("\n--- {} ---", demo.name);
    println!("{}", demo.description);
    print!("{}", demo.qp);

    let initial_cost = demo.qp.cost(&demo.initial)?;
    let solver = QpSolver::with_config(demo.qp.clone(), config);

    let start = Instant::now();
    let state = solver.initial_state(&demo.initial, &VectorValues::new(), false)?;
    let state = solver.solve_from(state)?;
    let elapsed = start.elapsed();

    let final_cost = demo.qp.cost(&state.values)?;
    println!(
        "cost {:.6} -> {:.6} in {} iterations ({:.3} ms)",
        initial_cost,
        final_cost,
        state.iterations,
        elapsed.as_secs_f64() * 1000.0
    );
    print!("solution {}", state.values);
    print!("multipliers {}", state.duals);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger_with_level(if args.verbose { Level::DEBUG } else { Level::INFO });

    let linear_solver_type = match args.linear_solver.as_str() {
        "cholesky" => LinearSolverType::SparseCholesky,
        "qr" => LinearSolverType::SparseQR,
        other => return Err(format!("unknown linear solver '{other}'").into()),
    };
    let config = QpSolverConfig::new()
        .with_max_iterations(args.max_iterations)
        .with_linear_solver_type(linear_solver_type);

    let demos = match args.problem.as_str() {
        "all" => vec![bound_demo()?, coupled_demo()?, nocedal_demo()?, equality_demo()?],
        "bound" => vec![bound_demo()?],
        "coupled" => vec![coupled_demo()?],
        "nocedal" => vec![nocedal_demo()?],
        "equality" => vec![equality_demo()?],
        other => return Err(format!("unknown problem '{other}'").into()),
    };

    println!("=== APEX-QP ACTIVE-SET DEMO ===");
    info!("linear solver {linear_solver_type:?}, max iterations {}", args.max_iterations);

    let mut failures = 0;
    for demo in &demos {
        if let Err(e) = run_demo(demo, config) {
            error!("{} failed: {e}", demo.name);
            failures += 1;
        }
    }

    println!("\nSummary: {}/{} problems solved", demos.len() - failures, demos.len());
    Ok(())
}
