//! Benchmarks for OscillatorNetwork::update.
//!
//! Run:
//! - cargo bench --bench cpg_update

use std::f64::consts::TAU;

use cablecpg::config::CpgConfig;
use cablecpg::core::cpg::{DescendingCommand, FeedbackGains, NodeParams, OscillatorNetwork};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const NODE_COUNTS: [usize; 4] = [4, 12, 24, 48];
const DT: f64 = 0.1;

/// Ring of nodes, each coupled to its two neighbours.
fn build_ring(nodes: usize) -> OscillatorNetwork {
    let cpg = CpgConfig::default();
    let mut net = OscillatorNetwork::new();
    for i in 0..nodes {
        let idx = i as f64;
        let params = NodeParams::from_scaled(1.0 + idx * 0.01, 2.0, &cpg).with_feedback(
            FeedbackGains {
                freq: 0.5,
                amp: 1.0,
                phase: 0.2,
            },
        );
        let index = net.add_node(params).unwrap();
        net.set_state(index, idx * TAU / nodes as f64, 1.0).unwrap();
    }
    for i in 0..nodes {
        let prev = (i + nodes - 1) % nodes;
        let next = (i + 1) % nodes;
        net.define_connections(i, &[prev, next], &[0.5, 0.5], &[0.3, -0.3])
            .unwrap();
    }
    net
}

fn bench_open_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpg_update_open_loop");
    group.sample_size(50);

    for &nodes in &NODE_COUNTS {
        let mut net = build_ring(nodes);
        let idle: &[DescendingCommand] = &[];
        let id = BenchmarkId::new("nodes", nodes);
        group.bench_function(id, |b| {
            b.iter(|| {
                net.update(black_box(idle), black_box(DT)).unwrap();
                black_box(net.cpg_value(0));
            });
        });
    }

    group.finish();
}

fn bench_with_feedback(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpg_update_feedback");
    group.sample_size(50);

    for &nodes in &NODE_COUNTS {
        let mut net = build_ring(nodes);
        let commands: Vec<DescendingCommand> = (0..nodes)
            .map(|i| DescendingCommand::from_feedback([0.1, -0.2, (i % 3) as f64 * 0.1]))
            .collect();
        let id = BenchmarkId::new("nodes", nodes);
        group.bench_with_input(id, &commands, |b, commands| {
            b.iter(|| {
                net.update(black_box(commands), black_box(DT)).unwrap();
                black_box(net.cpg_value(0));
            });
        });
    }

    group.finish();
}

criterion_group!(cpg_update, bench_open_loop, bench_with_feedback);
criterion_main!(cpg_update);
