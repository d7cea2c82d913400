//! 佣金计算性能基准测试

use afflink::services::commission_for;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// ============== commission_for 基准测试 ==============

fn bench_commission_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion/commission_for");

    group.bench_function("typical_order", |b| {
        b.iter(|| {
            // 99.90 的订单，2.5% 佣金
            black_box(commission_for(black_box(9_990), black_box(250)));
        });
    });

    group.bench_function("truncating_amount", |b| {
        b.iter(|| {
            black_box(commission_for(black_box(999), black_box(250)));
        });
    });

    group.bench_function("max_amount", |b| {
        b.iter(|| {
            // i128 放大路径
            black_box(commission_for(black_box(i64::MAX), black_box(10_000)));
        });
    });

    group.finish();
}

// ============== 费率扫描基准测试 ==============

fn bench_rate_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion/rate_sweep");

    for rate_bp in [1, 250, 500, 2_500, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(rate_bp),
            &rate_bp,
            |b, &rate| {
                b.iter(|| {
                    black_box(commission_for(black_box(123_456), black_box(rate)));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_commission_for, bench_rate_sweep);
criterion_main!(benches);
