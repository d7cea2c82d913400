//! 状态机与通知构造性能基准测试

use afflink::storage::{CommissionStatus, OrderStatus, OutboxIntent};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// ============== 状态解析基准测试 ==============

fn bench_status_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("models/status_parsing");

    group.bench_function("commission_status", |b| {
        b.iter(|| {
            let status: CommissionStatus = black_box("confirmed").parse().unwrap();
            black_box(status);
        });
    });

    group.bench_function("order_status", |b| {
        b.iter(|| {
            let status: OrderStatus = black_box("delivered").parse().unwrap();
            black_box(status);
        });
    });

    group.bench_function("invalid_status", |b| {
        b.iter(|| {
            let result = black_box("nonsense").parse::<CommissionStatus>();
            black_box(result.is_err());
        });
    });

    group.finish();
}

// ============== 状态迁移检查基准测试 ==============

fn bench_transitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("models/transitions");

    group.bench_function("can_transition_to", |b| {
        b.iter(|| {
            black_box(CommissionStatus::Pending.can_transition_to(CommissionStatus::Confirmed));
            black_box(CommissionStatus::Paid.can_transition_to(CommissionStatus::Canceled));
        });
    });

    group.finish();
}

// ============== 通知构造基准测试 ==============

fn bench_outbox_intent(c: &mut Criterion) {
    let mut group = c.benchmark_group("models/outbox_intent");

    group.bench_function("build_with_payload", |b| {
        b.iter(|| {
            let intent = OutboxIntent::new(
                "commission_earned",
                "user_1",
                serde_json::json!({
                    "order_id": "ord_1",
                    "commission_amount": 500,
                }),
            )
            .with_idempotency_key("commission_earned:ord_1");
            black_box(intent);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_status_parsing,
    bench_transitions,
    bench_outbox_intent
);
criterion_main!(benches);
