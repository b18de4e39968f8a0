#![allow(unused)]
extern crate bindscope;

use bindscope::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::hint::black_box;

/// Reads identities stored as display names, so the benchmark measures indexing and ranking
/// rather than PE parsing.
fn text_reader(data: &[u8]) -> Result<AssemblyIdentity> {
    let text = std::str::from_utf8(data)
        .map_err(|_| Error::Configuration("candidate is not text".to_string()))?;
    AssemblyIdentity::parse(text)
}

/// A package shaped like a large multi-targeting nupkg: `names` assemblies, each present for
/// several target frameworks, some signed, plus documentation files.
fn package(names: usize) -> MemoryArchive {
    const FRAMEWORKS: [&str; 6] = ["net45", "net48", "netstandard2.0", "net6.0", "net8.0", "net9.0"];

    let mut archive = MemoryArchive::new();
    for (tfm_index, tfm) in FRAMEWORKS.iter().enumerate() {
        archive = archive.with_directory(format!("lib/{}/", tfm));
        for i in 0..names {
            let token = if i % 2 == 0 { ", PublicKeyToken=b77a5c561934e089" } else { "" };
            let identity = format!("Lib{}, Version=1.{}.0.0{}", i, tfm_index, token);
            archive = archive
                .with_file(format!("lib/{}/Lib{}.dll", tfm, i), identity.into_bytes())
                .with_file(format!("lib/{}/Lib{}.xml", tfm, i), b"<doc/>".to_vec());
        }
    }
    archive
}

fn bench_index(c: &mut Criterion) {
    let archive = package(500);

    let mut group = c.benchmark_group("index");
    group.throughput(Throughput::Elements(archive.len() as u64));
    group.bench_function("build", |b| {
        b.iter(|| black_box(ArchiveIndex::build(black_box(&archive)).unwrap()));
    });
    group.bench_function("build_sorted", |b| {
        b.iter(|| black_box(ArchiveIndex::build_sorted(black_box(&archive)).unwrap()));
    });
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let archive = package(500);
    let queries: Vec<AssemblyIdentity> = (0..500)
        .map(|i| AssemblyIdentity::named(format!("lib{}", i)))
        .collect();

    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(queries.len() as u64));

    group.bench_function("cold", |b| {
        b.iter_batched(
            || {
                ArchiveResolver::builder(&archive)
                    .reader(text_reader)
                    .build()
                    .unwrap()
            },
            |resolver| {
                for query in &queries {
                    black_box(resolver.resolve(query));
                }
            },
            BatchSize::SmallInput,
        );
    });

    let warm = ArchiveResolver::builder(&archive)
        .reader(text_reader)
        .build()
        .unwrap();
    for query in &queries {
        let _ = warm.resolve(query);
    }
    group.bench_function("warm", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(warm.resolve(black_box(query)));
            }
        });
    });
    group.bench_function("warm_parallel", |b| {
        b.iter(|| black_box(warm.resolve_many(black_box(&queries))));
    });
    group.finish();
}

criterion_group!(benches, bench_index, bench_resolve);
criterion_main!(benches);
