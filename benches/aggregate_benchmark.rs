use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use loci_ci::insights::{aggregate, aggregate_batch, InsightRecord, InsightsBatch};
use loci_ci::report::{columns, Table};

fn create_records(count: usize, compared: bool) -> Vec<InsightRecord> {
    (0..count)
        .map(|i| {
            let binary = format!("lib{}.so", i % 16);
            let function = format!("fn_{}", i);
            let mean = 1_000.0 + (i as f64 * 37.0) % 5_000_000.0;
            let record = InsightRecord::new(&binary, &function).with_means(mean, mean / 3.0, mean / 50.0);
            if compared {
                let perc = ((i as f64 * 7.3) % 200.0) - 100.0;
                record
                    .with_base_means(mean * 0.9, mean / 3.1, mean / 52.0)
                    .with_percentages(perc, perc / 2.0, 0.0)
            } else {
                record
            }
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [100, 1_000, 10_000] {
        let single = create_records(size, false);
        let compared = create_records(size, true);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("single", size), &single, |b, records| {
            b.iter(|| aggregate(black_box(records), false, 10))
        });

        group.bench_with_input(BenchmarkId::new("compared", size), &compared, |b, records| {
            b.iter(|| aggregate(black_box(records), true, 10))
        });
    }

    group.finish();
}

fn bench_render_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_table");

    let batch = InsightsBatch::new(create_records(1_000, true));
    for top_n in [10, 100] {
        let report = aggregate_batch(&batch, true, top_n);
        let cols = columns(true);
        group.bench_with_input(BenchmarkId::new("markdown", top_n), &report, |b, report| {
            b.iter(|| Table::build(black_box(&report.rows), &cols).to_markdown())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_render_table);
criterion_main!(benches);
