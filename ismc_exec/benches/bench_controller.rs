//! # Controller Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ismc_lib::{
    frame::FrameVector,
    smc::{ControlState, DesiredState, IntegralAccumulator, Params, SlidingModeController},
};

fn controller_benchmark(c: &mut Criterion) {
    // ---- Build the controller and a representative tick ----

    let mut ctrl = SlidingModeController::new(Params {
        drag_diag: [0.05, 0.05, 0.1],
        ..Default::default()
    })
    .unwrap();

    let current = ControlState {
        position_m: FrameVector::new(0.4, -0.2, 0.9),
        velocity_ms: FrameVector::new(0.3, 0.1, -0.05),
    };
    let desired = DesiredState {
        position_m: FrameVector::new(0.5, -0.1, 1.0),
        velocity_ms: FrameVector::new(0.6, 0.2, 0.0),
        accel_mss: FrameVector::new(-0.1, 0.3, 0.0),
    };
    let s_int = FrameVector::new(0.02, -0.01, 0.005);

    c.bench_function("SlidingModeController::evaluate", |b| {
        b.iter(|| ctrl.evaluate(black_box(&current), black_box(&desired), black_box(&s_int)))
    });

    let mut integral = IntegralAccumulator::new(s_int, current.position_m, 30.0).unwrap();

    c.bench_function("IntegralAccumulator::refresh", |b| {
        b.iter(|| integral.refresh(black_box(&desired.position_m), black_box(&current.position_m)))
    });
}

criterion_group!(benches, controller_benchmark);
criterion_main!(benches);
