//! Tests for grid transfer operators on split and undivided grids.
//!
//! Restriction and interpolation of the same order are adjoint up to the volume
//! ratio: 8⟨R a, b⟩_coarse = ⟨a, I b⟩_fine, checked relative to ‖a‖‖I b‖. The
//! identity exercises every halo width, edge skip and boundary of the three passes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stencilmg::parallel::{LocalTransport, Transport};
use stencilmg::{FdError, GridDescriptor, Phases, PipelineOptions, Transformer, local_dot};

fn random(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.r#gen::<f64>() - 0.5).collect()
}

fn adjoint_gap(global: [usize; 3], periodic: [bool; 3], nranks: usize, order: usize) -> f64 {
    let gaps = LocalTransport::<f64>::run(nranks, |comm| {
        let fine = GridDescriptor::decomposed(global, periodic, [0.2; 3], [nranks, 1, 1], comm.rank()).unwrap();
        let coarse = fine.coarsen().unwrap();
        let r = Transformer::restrict(&fine, &coarse, order, 1).unwrap();
        let i = Transformer::interpolate(&coarse, &fine, order, 1).unwrap();
        let opts = PipelineOptions::serial();
        let phases = Phases::identity();

        let a = random(fine.points(), 11 + comm.rank() as u64);
        let b = random(coarse.points(), 97 + comm.rank() as u64);
        let mut ra = vec![0.0; coarse.points()];
        let mut ib = vec![0.0; fine.points()];
        r.apply(comm, &a, &mut ra, &phases, &opts).unwrap();
        i.apply(comm, &b, &mut ib, &phases, &opts).unwrap();

        let lhs = 8.0 * comm.all_reduce_sum(local_dot(&ra, &b));
        let rhs = comm.all_reduce_sum(local_dot(&a, &ib));
        let scale = (comm.dot(&a, &a) * comm.dot(&ib, &ib)).sqrt();
        (lhs - rhs).abs() / scale
    });
    gaps.into_iter().fold(0.0, f64::max)
}

/// Test: adjointness on a fully periodic grid, undivided and split along axis 0.
#[test]
fn restrict_interpolate_adjoint_periodic() {
    for order in [2, 4, 6, 8] {
        for nranks in [1, 2] {
            let gap = adjoint_gap([16, 8, 8], [true; 3], nranks, order);
            assert!(gap < 1e-12, "order {order}, {nranks} ranks: {gap}");
        }
    }
}

/// Test: adjointness with zero boundaries. Odd fine ranges exercise the edge skips.
#[test]
fn restrict_interpolate_adjoint_zero_boundary() {
    for order in [2, 4, 6, 8] {
        for nranks in [1, 2] {
            let gap = adjoint_gap([32, 8, 8], [false; 3], nranks, order);
            assert!(gap < 1e-12, "order {order}, {nranks} ranks: {gap}");
        }
    }
}

/// Test: a transfer split over two partitions reproduces the undivided result on
/// each partition's share of the output.
#[test]
fn split_transfer_matches_undivided() {
    let global = [16, 8, 8];
    let periodic = [true, true, false];
    let field = |g: [usize; 3]| ((g[0] * 13 + g[1] * 5 + g[2] * 3) % 17) as f64 * 0.25;
    let gaps = LocalTransport::<f64>::run(2, |comm| {
        let whole = GridDescriptor::new(global, periodic, [0.2; 3]).unwrap();
        let part = GridDescriptor::decomposed(global, periodic, [0.2; 3], [2, 1, 1], comm.rank()).unwrap();
        let mut worst: f64 = 0.0;
        let reference = {
            let solo = LocalTransport::solo();
            let coarse = whole.coarsen().unwrap();
            let r = Transformer::restrict(&whole, &coarse, 6, 1).unwrap();
            let input = grid_values(&whole, field);
            let mut out = vec![0.0; coarse.points()];
            r.apply(&solo, &input, &mut out, &Phases::identity(), &PipelineOptions::serial()).unwrap();
            (coarse, out)
        };
        let coarse = part.coarsen().unwrap();
        let r = Transformer::restrict(&part, &coarse, 6, 1).unwrap();
        let input = grid_values(&part, field);
        let mut out = vec![0.0; coarse.points()];
        r.apply(comm, &input, &mut out, &Phases::identity(), &PipelineOptions::serial()).unwrap();

        let (whole_coarse, whole_out) = reference;
        let wn = whole_coarse.n();
        let n = coarse.n();
        for i0 in 0..n[0] {
            for i1 in 0..n[1] {
                for i2 in 0..n[2] {
                    let g0 = coarse.beg(0) + i0 - whole_coarse.beg(0);
                    let g1 = coarse.beg(1) + i1 - whole_coarse.beg(1);
                    let g2 = coarse.beg(2) + i2 - whole_coarse.beg(2);
                    let expected = whole_out[(g0 * wn[1] + g1) * wn[2] + g2];
                    let got = out[(i0 * n[1] + i1) * n[2] + i2];
                    worst = worst.max((got - expected).abs());
                }
            }
        }
        worst
    });
    for g in gaps {
        assert!(g < 1e-13, "{g}");
    }
}

fn grid_values(gd: &GridDescriptor, f: impl Fn([usize; 3]) -> f64) -> Vec<f64> {
    let n = gd.n();
    let mut out = Vec::with_capacity(gd.points());
    for i0 in 0..n[0] {
        for i1 in 0..n[1] {
            for i2 in 0..n[2] {
                out.push(f([gd.beg(0) + i0, gd.beg(1) + i1, gd.beg(2) + i2]));
            }
        }
    }
    out
}

/// Test: interpolating a constant on a periodic grid gives the same constant,
/// with two channels per point.
#[test]
fn interpolation_keeps_constants_per_channel() {
    let worst = LocalTransport::<f64>::run(2, |comm| {
        let fine = GridDescriptor::decomposed([8, 8, 12], [true; 3], [0.3; 3], [2, 1, 1], comm.rank()).unwrap();
        let coarse = fine.coarsen().unwrap();
        let i = Transformer::interpolate(&coarse, &fine, 4, 2).unwrap();
        let input: Vec<f64> = (0..coarse.points()).flat_map(|_| [1.5, -2.0]).collect();
        let mut out = vec![0.0; 2 * fine.points()];
        i.apply(comm, &input, &mut out, &Phases::identity(), &PipelineOptions::serial()).unwrap();
        out.chunks(2)
            .map(|p| (p[0] - 1.5).abs().max((p[1] + 2.0).abs()))
            .fold(0.0f64, f64::max)
    });
    for w in worst {
        assert!(w < 1e-14, "{w}");
    }
}

/// Test: unsupported orders and unrelated grids are rejected at construction.
#[test]
fn transfer_construction_errors() {
    let fine = GridDescriptor::new([8, 8, 8], [true; 3], [0.5; 3]).unwrap();
    let coarse = fine.coarsen().unwrap();
    assert!(matches!(Transformer::restrict(&fine, &coarse, 5, 1), Err(FdError::UnsupportedOrder(5))));
    let other = GridDescriptor::new([8, 8, 4], [true; 3], [0.5; 3]).unwrap();
    assert!(matches!(Transformer::interpolate(&other, &fine, 2, 1), Err(FdError::InvalidGrid(_))));
}
