//! Benchmarks for sshs store operations

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use sshs::{AttributeFlags, Tree};

fn bench_attribute_access(c: &mut Criterion) {
    let tree = Tree::new();
    let node = tree.node("/bench/");
    node.create_int(
        "value",
        0,
        i32::MIN,
        i32::MAX,
        AttributeFlags::NORMAL,
        "benched value",
    );

    c.bench_function("put_int_changed", |b| {
        let mut next = 0i32;
        b.iter(|| {
            next = next.wrapping_add(1);
            node.put_int("value", black_box(next)).unwrap();
        });
    });

    c.bench_function("put_int_unchanged", |b| {
        node.put_int("value", 7).unwrap();
        b.iter(|| {
            node.put_int("value", black_box(7)).unwrap();
        });
    });

    c.bench_function("get_int", |b| {
        b.iter(|| black_box(node.get_int("value")));
    });
}

fn bench_path_resolution(c: &mut Criterion) {
    let tree = Tree::new();
    tree.node("/devices/camera/bias/");

    c.bench_function("node_lookup_three_levels", |b| {
        b.iter(|| black_box(tree.node("/devices/camera/bias/")));
    });
}

fn bench_xml_export(c: &mut Criterion) {
    let tree = Tree::new();
    for n in 0..8 {
        let node = tree.node(&format!("/device{n}/"));
        for k in 0..8 {
            node.create_int(
                &format!("attr{k}"),
                k,
                0,
                100,
                AttributeFlags::NORMAL,
                "benched value",
            );
        }
    }

    c.bench_function("export_sub_tree", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(4096);
            tree.root().export_sub_tree_to_xml(&mut out).unwrap();
            black_box(out)
        });
    });
}

criterion_group!(
    benches,
    bench_attribute_access,
    bench_path_resolution,
    bench_xml_export
);
criterion_main!(benches);
