//! Tests for the three-level multigrid preconditioner.

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use num_complex::Complex64;
use stencilmg::parallel::{LocalTransport, Transport};
use stencilmg::{FdError, FdOperator, GridDescriptor, Multigrid, Phases, PipelineOptions, Preconditioner, Stencil};

fn kinetic(gd: &GridDescriptor, channels: usize) -> FdOperator {
    FdOperator::new(gd, Stencil::kinetic(gd.spacing(), 2).unwrap(), channels).unwrap()
}

fn lowest_mode(gd: &GridDescriptor) -> Vec<f64> {
    let n = gd.n();
    let period = gd.global()[0] as f64;
    let mut out = Vec::with_capacity(gd.points());
    for i0 in 0..n[0] {
        let c = (2.0 * PI * (gd.beg(0) + i0) as f64 / period).cos();
        out.extend(std::iter::repeat(c).take(n[1] * n[2]));
    }
    out
}

/// ‖kin(−d) − r‖ / ‖r‖ after one preconditioner application.
fn reduction(comm: &LocalTransport<f64>, gd: &GridDescriptor) -> (f64, Vec<f64>) {
    let opts = PipelineOptions::serial();
    let mg = Multigrid::new(gd, kinetic(gd, 1), 4, opts.clone()).unwrap();
    let r = lowest_mode(gd);
    let mut d = vec![0.0; r.len()];
    mg.apply(comm, &r, &mut d, &Phases::identity()).unwrap();
    let neg: Vec<f64> = d.iter().map(|v| -v).collect();
    let mut kd = vec![0.0; r.len()];
    kinetic(gd, 1).apply(comm, &neg, &mut kd, &Phases::identity(), &opts).unwrap();
    let res: Vec<f64> = kd.iter().zip(&r).map(|(a, b)| a - b).collect();
    ((comm.dot(&res, &res) / comm.dot(&r, &r)).sqrt(), d)
}

/// Test: a zero residual gives an exactly zero correction.
#[test]
fn zero_residual_gives_zero_correction() {
    let gd = GridDescriptor::new([8, 8, 8], [true; 3], [0.3; 3]).unwrap();
    let mg = Multigrid::new(&gd, kinetic(&gd, 2), 2, PipelineOptions::serial()).unwrap();
    let comm = LocalTransport::<f64>::solo();
    let r = vec![0.0; 2 * gd.points()];
    let mut d = vec![1.0; r.len()];
    mg.apply(&comm, &r, &mut d, &Phases::identity()).unwrap();
    assert!(d.iter().all(|&v| v == 0.0));
}

/// Test: one application removes a large part of the smoothest residual, which a
/// single damped step alone barely touches.
#[test]
fn smooth_residual_is_reduced() {
    let gd = GridDescriptor::new([16, 16, 16], [true; 3], [0.2; 3]).unwrap();
    let comm = LocalTransport::solo();
    let (ratio, _) = reduction(&comm, &gd);
    assert!(ratio < 0.65, "residual ratio {ratio}");

    let mg = Multigrid::new(&gd, kinetic(&gd, 1), 4, PipelineOptions::serial()).unwrap();
    let diag = kinetic(&gd, 1).diagonal();
    assert_abs_diff_eq!(mg.step() * diag, 0.66666666, epsilon = 1e-12);
}

/// Test: two partitions give the same correction as one.
#[test]
fn split_grid_matches_undivided() {
    let global = [16, 16, 16];
    let whole = GridDescriptor::new(global, [true; 3], [0.2; 3]).unwrap();
    let (ratio, reference) = reduction(&LocalTransport::solo(), &whole);
    let out = LocalTransport::<f64>::run(2, |comm| {
        let gd = GridDescriptor::decomposed(global, [true; 3], [0.2; 3], [2, 1, 1], comm.rank()).unwrap();
        let (r, d) = reduction(comm, &gd);
        let offset = gd.beg(0) * global[1] * global[2];
        let gap = d
            .iter()
            .enumerate()
            .map(|(i, v)| (v - reference[offset + i]).abs())
            .fold(0.0f64, f64::max);
        (r, gap)
    });
    for (r, gap) in out {
        assert_abs_diff_eq!(r, ratio, epsilon = 1e-12);
        assert!(gap < 1e-12, "{gap}");
    }
}

/// Test: complex Bloch fields run through the same cycle.
#[test]
fn complex_fields_with_phases() {
    let gd = GridDescriptor::new([8, 8, 8], [true; 3], [0.3; 3]).unwrap();
    let mg = Multigrid::new(&gd, kinetic(&gd, 1), 2, PipelineOptions::serial()).unwrap();
    let comm = LocalTransport::<Complex64>::solo();
    let r: Vec<Complex64> = (0..gd.points()).map(|i| Complex64::new((i % 5) as f64, -1.0)).collect();
    let mut d = vec![Complex64::new(0.0, 0.0); r.len()];
    mg.apply(&comm, &r, &mut d, &Phases::bloch([0.25, 0.0, 0.0])).unwrap();
    assert!(d.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
    assert!(d.iter().any(|v| v.norm() > 0.0));
}

/// Test: a grid that cannot be coarsened twice is rejected.
#[test]
fn needs_two_coarsenings() {
    let gd = GridDescriptor::new([6, 8, 8], [true; 3], [0.3; 3]).unwrap();
    let err = Multigrid::new(&gd, kinetic(&gd, 1), 2, PipelineOptions::serial());
    assert!(matches!(err, Err(FdError::InvalidGrid(_))));
}
