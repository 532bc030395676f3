use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::{Arc, Mutex};
use trellis_renderer::tags::{li, span, ul};
use trellis_renderer::{
    attr, children, key, Child, Document, MemoryDocument, Root, RootBuilder, RootOptions, VNode,
};

fn root() -> Root {
    let mut document = MemoryDocument::new();
    let body = document.create_element("body");
    RootBuilder::new(Arc::new(Mutex::new(document)), body)
        .options(RootOptions {
            background: false,
            ..RootOptions::default()
        })
        .build()
}

fn keyed_list(order: &[usize]) -> VNode {
    ul(order
        .iter()
        .map(|i| {
            li(children![
                key(i.to_string()),
                attr("class", "row"),
                span(children![*i]),
            ])
            .into()
        })
        .collect::<Vec<Child>>())
}

fn mount_1000_rows(c: &mut Criterion) {
    let order: Vec<usize> = (0..1000).collect();

    c.bench_function("mount_1000_rows", |b| {
        b.iter(|| {
            let root = root();
            root.render(black_box(keyed_list(&order))).unwrap();
        })
    });
}

fn rerender_identical_1000_rows(c: &mut Criterion) {
    let order: Vec<usize> = (0..1000).collect();
    let root = root();
    root.render(keyed_list(&order)).unwrap();

    c.bench_function("rerender_identical_1000_rows", |b| {
        b.iter(|| {
            // Nothing changed, so nothing is written
            root.render(black_box(keyed_list(&order))).unwrap();
        })
    });
}

fn reverse_1000_rows(c: &mut Criterion) {
    let forward: Vec<usize> = (0..1000).collect();
    let backward: Vec<usize> = forward.iter().rev().copied().collect();
    let root = root();
    root.render(keyed_list(&forward)).unwrap();

    let mut flip = false;
    c.bench_function("reverse_1000_rows", |b| {
        b.iter(|| {
            flip = !flip;
            let order = if flip { &backward } else { &forward };
            root.render(black_box(keyed_list(order))).unwrap();
        })
    });
}

fn rotate_1000_rows(c: &mut Criterion) {
    let mut order: Vec<usize> = (0..1000).collect();
    let root = root();
    root.render(keyed_list(&order)).unwrap();

    c.bench_function("rotate_1000_rows", |b| {
        b.iter(|| {
            order.rotate_right(1);
            root.render(black_box(keyed_list(&order))).unwrap();
        })
    });
}

criterion_group!(
    benches,
    mount_1000_rows,
    rerender_identical_1000_rows,
    reverse_1000_rows,
    rotate_1000_rows
);
criterion_main!(benches);
