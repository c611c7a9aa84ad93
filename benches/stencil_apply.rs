use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use stencilmg::parallel::LocalTransport;
use stencilmg::{FdOperator, GridDescriptor, Multigrid, Phases, PipelineOptions, Preconditioner, Stencil, Transformer};

fn field(len: usize) -> Vec<f64> {
    (0..len).map(|i| (i as f64 * 0.37).sin()).collect()
}

fn bench_laplace(c: &mut Criterion) {
    let gd = GridDescriptor::new([32, 32, 32], [true; 3], [0.2; 3]).unwrap();
    let op = FdOperator::laplace(&gd, 1.0, 3, 1).unwrap();
    let comm = LocalTransport::solo();
    let nbatch = 8;
    let input = field(nbatch * gd.points());
    let mut output = vec![0.0; input.len()];

    let mut group = c.benchmark_group("laplace nn=3 32^3 x8");
    for (name, overlap) in [("overlapped", true), ("reference", false)] {
        let opts = PipelineOptions::default().with_double_buffering(overlap);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                op.apply(&comm, black_box(&input), &mut output, &Phases::identity(), &opts).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_transfer(c: &mut Criterion) {
    let fine = GridDescriptor::new([32, 32, 32], [true; 3], [0.2; 3]).unwrap();
    let coarse = fine.coarsen().unwrap();
    let comm = LocalTransport::solo();
    let opts = PipelineOptions::serial();
    let a = field(fine.points());
    let mut b = vec![0.0; coarse.points()];
    for order in [2, 6] {
        let r = Transformer::restrict(&fine, &coarse, order, 1).unwrap();
        c.bench_function(&format!("restrict order {order} 32^3"), |bench| {
            bench.iter(|| r.apply(&comm, black_box(&a), &mut b, &Phases::identity(), &opts).unwrap())
        });
    }
}

fn bench_multigrid(c: &mut Criterion) {
    let gd = GridDescriptor::new([32, 32, 32], [true; 3], [0.2; 3]).unwrap();
    let kin = FdOperator::new(&gd, Stencil::kinetic(gd.spacing(), 3).unwrap(), 1).unwrap();
    let mg = Multigrid::new(&gd, kin, 4, PipelineOptions::default()).unwrap();
    let comm = LocalTransport::solo();
    let r = field(gd.points());
    let mut d = vec![0.0; r.len()];
    c.bench_function("multigrid preconditioner 32^3", |b| {
        b.iter(|| mg.apply(&comm, black_box(&r), &mut d, &Phases::identity()).unwrap())
    });
}

criterion_group!(benches, bench_laplace, bench_transfer, bench_multigrid);
criterion_main!(benches);
