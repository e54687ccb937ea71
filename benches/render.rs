use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use sqlmapper::scripting::SqlSource;
use sqlmapper::types::TypeHandlerRegistry;
use sqlmapper::Record;
use std::sync::Arc;

const STATIC_SQL: &str = "SELECT id, name, email FROM author WHERE id = #{id} AND name = #{name,jdbcType=VARCHAR}";

fn dynamic_sql(conditions: usize) -> String {
    let mut sql = String::from("SELECT * FROM author WHERE id > 0");
    for i in 0..conditions {
        sql.push_str(&format!(" <if test=\"f{i} != null\">AND c{i} = #{{f{i}}}</if>"));
    }
    sql
}

fn bench_render(c: &mut Criterion) {
    let registry = Arc::new(TypeHandlerRegistry::new());
    let mut group = c.benchmark_group("render");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(50);

    // Static templates resolve placeholders once at build time
    let source = SqlSource::from_script(STATIC_SQL, &registry).expect("static template");
    group.bench_function("static", |b| {
        b.iter(|| criterion::black_box(source.bound_statement(&7i64).expect("bind")));
    });

    for &n in &[4usize, 16, 64] {
        let source = SqlSource::from_script(&dynamic_sql(n), &registry).expect("dynamic template");
        let mut param = Record::new();
        // every other condition present
        for i in (0..n).step_by(2) { param.insert(format!("f{i}"), i as i64); }
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("dynamic_if", n.to_string()), &n, |b, _| {
            b.iter(|| criterion::black_box(source.bound_statement(&param).expect("render")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
