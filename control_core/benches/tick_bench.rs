use control_core::types::{BoundingBox, Clock, Detection};
use control_core::{ControlConfig, ControlLoop};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn detection(x: f64, y: f64) -> Detection {
    Detection {
        label: "person".into(),
        score: 0.9,
        bbox: BoundingBox::new(x - 30.0, y - 30.0, x + 30.0, y + 30.0),
    }
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    let dt = 1.0 / 30.0;

    group.bench_function("scanning", |b| {
        let mut ctl = ControlLoop::new(ControlConfig::default(), Clock::new(), None);
        let mut now = 0.0;
        b.iter(|| {
            now += dt;
            black_box(ctl.tick(now, None, f64::INFINITY));
        });
    });

    group.bench_function("tracking", |b| {
        let mut ctl = ControlLoop::new(ControlConfig::default(), Clock::new(), None);
        let det = detection(180.0, 300.0);
        let mut now = 0.0;
        b.iter(|| {
            now += dt;
            black_box(ctl.tick(now, Some(&det), 0.1));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
