use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use indicatif::ProgressBar;
use site_deploy::remote::memory::MemoryFs;
use site_deploy::rules::TransferRules;
use site_deploy::scanner::scan_local;
use site_deploy::sync::{apply_plan, plan_sync, walk_remote, RemoteTree};

/// Create a build output directory with N files plus some excluded noise
fn create_test_files(dir: &TempDir, count: usize) -> PathBuf {
    let dist = dir.path().join("dist");
    fs::create_dir_all(&dist).unwrap();

    for i in 0..count {
        let subdir = dist.join(format!("assets{}", i % 10));
        fs::create_dir_all(&subdir).unwrap();
        fs::write(subdir.join(format!("chunk{}.js", i)), format!("content {}", i)).unwrap();
    }

    fs::create_dir_all(dist.join("node_modules/pkg")).unwrap();
    fs::write(dist.join("node_modules/pkg/index.js"), "x").unwrap();
    fs::write(dist.join("build.log"), "x").unwrap();
    fs::write(dist.join(".htaccess"), "RewriteEngine On").unwrap();

    dist
}

/// Benchmark local scanning with the standard rules
fn bench_scan_local(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_local");
    let rules = TransferRules::standard();

    for file_count in [100, 500, 1000].iter() {
        let temp = TempDir::new().unwrap();
        let dist = create_test_files(&temp, *file_count);

        group.throughput(Throughput::Elements(*file_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            file_count,
            |b, _| b.iter(|| scan_local(black_box(&dist), &rules).unwrap()),
        );
    }

    group.finish();
}

/// Benchmark mirror planning against a half-overlapping remote tree
fn bench_plan_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_sync");
    let rules = TransferRules::standard();

    for file_count in [1000, 10000].iter() {
        let temp = TempDir::new().unwrap();
        let dist = create_test_files(&temp, *file_count);
        let local = scan_local(&dist, &rules).unwrap();

        let mut remote = RemoteTree::default();
        for (i, file) in local.files.iter().enumerate() {
            if i % 2 == 0 {
                remote.files.insert(file.relative.clone());
            } else {
                remote.files.insert(format!("stale/{}", file.relative));
            }
        }
        remote.dirs.insert("stale".to_string());

        group.throughput(Throughput::Elements(*file_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            file_count,
            |b, _| b.iter(|| plan_sync(black_box(&local), black_box(&remote))),
        );
    }

    group.finish();
}

/// Benchmark a full mirror into the in-memory remote
fn bench_apply_plan(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let dist = create_test_files(&temp, 500);
    let local = scan_local(&dist, &TransferRules::standard()).unwrap();

    c.bench_function("apply_plan_500_files", |b| {
        b.iter(|| {
            let mut fs = MemoryFs::new().with_dir("/site");
            let remote = walk_remote(&mut fs, "/site").unwrap();
            let plan = plan_sync(&local, &remote);
            apply_plan(&mut fs, &plan, "/site", &ProgressBar::hidden()).unwrap()
        })
    });
}

criterion_group!(benches, bench_scan_local, bench_plan_sync, bench_apply_plan);
criterion_main!(benches);
