//! Performance benchmarks for order transformation and report rendering.
//!
//! - Transform of a typical team (200 rows)
//! - Scaling of the transform from 10 to 10 000 rows
//! - Rendering a two-sheet workbook for 1 000 rows
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use team_reports::config::{BusinessRules, ReportConfig, default_columns};
use team_reports::models::RawRow;
use team_reports::report::ReportBuilder;
use team_reports::transform::Transformer;

/// Creates `count` order rows, every third one invoiced.
fn create_rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|i| {
            let status = if i % 3 == 0 { "Faturado" } else { "Pendente" };
            let org_unit = [1, 10, 11, 12, 14][i % 5];
            let value = i as f64 * 13.75;
            serde_json::json!({
                "dEmpresas[Empresa]": org_unit,
                "dCalendario[Data]": format!("2026-10-{:02}T00:00:00", i % 28 + 1),
                "dEquipes[Nome da Equipe]": "Norte",
                "dVendedores[Nome Vendedor Completo]": format!("Seller {}", i % 17),
                "dClientes[Nome Completo do Cliente]": format!("Customer {}", i),
                "fPedidos[Nota Fiscal - Texto]": format!("NF-{:06}", i),
                "fPedidos[Pedido - Texto]": format!("PED-{:06}", i),
                "fPedidos[Legenda Situação]": status,
                "[Ingressado]": value
            })
            .as_object()
            .cloned()
            .unwrap_or_default()
        })
        .collect()
}

/// Benchmark: one typical team.
fn bench_transform_team(c: &mut Criterion) {
    let rules = BusinessRules::default();
    let columns = default_columns();
    let transformer = Transformer::new(&rules, &columns);
    let rows = create_rows(200);

    c.bench_function("transform_200_rows", |b| {
        b.iter(|| black_box(transformer.transform(black_box(&rows)).unwrap()))
    });
}

/// Benchmark: row counts to understand scaling behavior.
fn bench_transform_scaling(c: &mut Criterion) {
    let rules = BusinessRules::default();
    let columns = default_columns();
    let transformer = Transformer::new(&rules, &columns);

    let mut group = c.benchmark_group("transform_scaling");
    for count in [10usize, 100, 1_000, 10_000] {
        let rows = create_rows(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rows", count), &rows, |b, rows| {
            b.iter(|| black_box(transformer.transform(rows).unwrap()))
        });
    }
    group.finish();
}

/// Benchmark: workbook rendering.
fn bench_render(c: &mut Criterion) {
    let rules = BusinessRules::default();
    let columns = default_columns();
    let report = Transformer::new(&rules, &columns)
        .transform(&create_rows(1_000))
        .unwrap();
    let config = ReportConfig::default();
    let builder = ReportBuilder::new(&config, &columns, std::env::temp_dir());

    let mut group = c.benchmark_group("report_rendering");
    group.sample_size(20);
    group.bench_function("render_1000_rows", |b| {
        b.iter(|| black_box(builder.render(&report).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_transform_team,
    bench_transform_scaling,
    bench_render
);
criterion_main!(benches);
