// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::Infallible;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_measure::{
    Axes, ComputedBox, Deferred, EdgeBox, HashStore, LayoutManager, LayoutScope, NodeTree,
    SizeStore, SlotStore, StyleReader,
};

/// Complete tree with `FANOUT` children per node, numbered breadth first.
struct Tree {
    len: u32,
    detached_from: u32,
}

const FANOUT: u32 = 4;

impl NodeTree<u32> for Tree {
    fn is_attached(&self, node: u32) -> bool {
        node < self.detached_from
    }

    fn children(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        let first = node * FANOUT + 1;
        (first..first + FANOUT).filter(|&c| c < self.len)
    }
}

/// Every `stride`-th node is `bump` pixels wider than the rest.
struct Styles {
    stride: u32,
    bump: f64,
}

impl StyleReader<u32> for Styles {
    type Error = Infallible;

    fn read(&mut self, node: u32) -> Result<ComputedBox, Infallible> {
        let extra = if node % self.stride == 0 { self.bump } else { 0.0 };
        Ok(ComputedBox {
            border: EdgeBox::uniform(1),
            padding: EdgeBox::uniform(2),
            content_width: f64::from(node % 97) + extra,
            content_height: 18.0,
            ..ComputedBox::ZERO
        })
    }
}

fn noop(_: u32, axes: Axes, _: &mut Deferred<u32, u32>) -> Result<(), Infallible> {
    black_box(axes);
    Ok(())
}

/// A measured manager where every node's parent depends on it.
fn build<S: SizeStore<u32, u32>>(store: S, tree: &Tree) -> LayoutManager<u32, u32, S> {
    let mut manager = LayoutManager::with_store(store);
    for node in 1..tree.len {
        manager.register_dependency((node - 1) / FANOUT, node);
    }
    let mut styles = Styles {
        stride: 8,
        bump: 0.0,
    };
    manager.layout(LayoutScope::Root(0), &mut styles, tree, &mut noop);
    manager
}

fn bench_passes<S: SizeStore<u32, u32>>(c: &mut Criterion, label: &str, store: fn() -> S) {
    let mut group = c.benchmark_group(format!("understory_measure/{label}"));
    group.sample_size(50);

    for &n in &[256_u32, 4_096_u32] {
        let tree = Tree {
            len: n,
            detached_from: n,
        };

        group.bench_function(format!("steady_pass(n={n})"), |b| {
            let mut manager = build(store(), &tree);
            let mut styles = Styles {
                stride: 8,
                bump: 0.0,
            };
            b.iter(|| {
                let report =
                    manager.layout(LayoutScope::Root(0), &mut styles, &tree, &mut noop);
                black_box(report);
            });
        });

        group.bench_function(format!("eighth_changed_pass(n={n})"), |b| {
            let mut manager = build(store(), &tree);
            let mut styles = Styles {
                stride: 8,
                bump: 0.0,
            };
            b.iter(|| {
                styles.bump = if styles.bump == 0.0 { 3.0 } else { 0.0 };
                let report =
                    manager.layout(LayoutScope::Root(0), &mut styles, &tree, &mut noop);
                black_box(report);
            });
        });

        group.bench_function(format!("sweep_half(n={n})"), |b| {
            let half = Tree {
                len: n / 2,
                detached_from: n / 2,
            };
            b.iter_batched(
                || build(store(), &tree),
                |mut manager| {
                    let mut styles = Styles {
                        stride: 8,
                        bump: 0.0,
                    };
                    let report =
                        manager.layout(LayoutScope::Root(0), &mut styles, &half, &mut noop);
                    black_box(report);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_measure(c: &mut Criterion) {
    bench_passes(c, "hash_store", HashStore::<u32, u32>::default);
    bench_passes(c, "slot_store", SlotStore::<u32, u32>::default);
}

criterion_group!(benches, bench_measure);
criterion_main!(benches);
