//! Benchmarks for cascades through adder chains.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use propnet::{ConnectorId, Network};

/// `x[i] + one = x[i + 1]` for `len` links.
fn chain(len: usize) -> (Network<i64>, Vec<ConnectorId>) {
    let mut net = Network::new();
    let one = net.add_connector();
    net.add_constant(one, 1).unwrap();
    let mut nodes = vec![net.add_connector()];
    for _ in 0..len {
        let next = net.add_connector();
        net.add_adder(*nodes.last().unwrap(), one, next).unwrap();
        nodes.push(next);
    }
    (net, nodes)
}

/// Set the head of a chain, derive every link, then retract.
fn bench_forward_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_chain");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (mut net, nodes) = chain(n);
            b.iter(|| {
                net.set_value(nodes[0], black_box(0)).unwrap();
                for node in &nodes {
                    net.drop_value(*node).unwrap();
                }
            });
        });
    }

    group.finish();
}

/// Set the tail of a chain and solve back to the head.
fn bench_backward_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_chain");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (mut net, nodes) = chain(n);
            b.iter(|| {
                net.set_value(nodes[n], black_box(n as i64)).unwrap();
                for node in &nodes {
                    net.drop_value(*node).unwrap();
                }
            });
        });
    }

    group.finish();
}

/// A failing call that rolls back the whole cascade.
fn bench_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollback");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (mut net, nodes) = chain(n);
            // Tail fixed to a value the head cannot reach
            net.set_value(nodes[n], 0).unwrap();
            for node in &nodes[..n] {
                net.drop_value(*node).unwrap();
            }
            b.iter(|| {
                let result = net.set_value(nodes[0], black_box(1));
                assert!(result.is_err());
            });
        });
    }

    group.finish();
}

/// Building a chain, including the attach pass of every adder.
fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| chain(black_box(n)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_forward_chain,
    bench_backward_chain,
    bench_rollback,
    bench_construction
);
criterion_main!(benches);
