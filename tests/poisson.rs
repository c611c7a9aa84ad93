//! Tests for the multigrid Poisson solver on a grid with zero boundaries.

use stencilmg::parallel::{LocalTransport, Transport};
use stencilmg::{FdOperator, GridDescriptor, Phases, PipelineOptions, PoissonOptions, PoissonSolver};

const H: f64 = 0.25;

fn density(gd: &GridDescriptor) -> Vec<f64> {
    let n = gd.n();
    let mut rho = Vec::with_capacity(gd.points());
    for i0 in 0..n[0] {
        for i1 in 0..n[1] {
            for i2 in 0..n[2] {
                let [x, y, z] = [gd.beg(0) + i0, gd.beg(1) + i1, gd.beg(2) + i2].map(|g| g as f64 * H - 2.0);
                let a = (-2.0 * (x * x + y * y + z * z)).exp();
                let b = (-3.0 * ((x - 0.7).powi(2) + y * y + (z + 0.5).powi(2))).exp();
                rho.push(a - 0.5 * b);
            }
        }
    }
    rho
}

/// Test: V-cycles shrink the integrated squared residual by orders of magnitude.
#[test]
fn cycles_reduce_residual() {
    let gd = GridDescriptor::new([16, 16, 16], [false; 3], [H; 3]).unwrap();
    let solver = PoissonSolver::new(&gd, PoissonOptions::default(), PipelineOptions::serial()).unwrap();
    assert_eq!(solver.levels(), 3);
    let comm = LocalTransport::solo();
    let rho = density(&gd);
    let mut phi = vec![0.0; rho.len()];
    let errors: Vec<f64> = (0..6).map(|_| solver.iterate(&comm, &mut phi, &rho).unwrap()).collect();
    assert!(errors[0] > 0.0);
    assert!(errors[5] < 1e-4 * errors[0], "{errors:?}");
}

/// Test: `solve` converges and the potential satisfies the discrete equation.
#[test]
fn solve_converges_split_over_ranks() {
    let out = LocalTransport::<f64>::run(2, |comm| {
        let gd = GridDescriptor::decomposed([16, 16, 16], [false; 3], [H; 3], [2, 1, 1], comm.rank()).unwrap();
        // 16 points over two ranks leave room for a single coarse level; solve it well.
        let opts = PoissonOptions { max_iter: 50, coarse_sweeps: 30, ..PoissonOptions::default() };
        let solver = PoissonSolver::new(&gd, opts.clone(), PipelineOptions::serial()).unwrap();
        assert_eq!(solver.levels(), 2);
        let rho = density(&gd);
        let mut phi = vec![0.0; rho.len()];
        let stats = solver.solve(comm, &mut phi, &rho).unwrap();

        let lap = FdOperator::laplace(&gd, 1.0, opts.nn, 1).unwrap();
        let mut r = vec![0.0; rho.len()];
        lap.residual(comm, &phi, &rho, &mut r, &Phases::identity(), &PipelineOptions::serial()).unwrap();
        let integrated = gd.dv() * comm.dot(&r, &r);
        (stats.converged, stats.iterations, integrated)
    });
    for (converged, iterations, integrated) in out {
        assert!(converged);
        assert!(iterations <= 20, "{iterations} cycles");
        assert!(integrated < 1e-8, "{integrated}");
    }
}
