use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlhydra::qb::{self, Filter, Ordered, SelectQb};
use sqlhydra::{Dialect, Expr};

/// SELECT with `n` equality predicates, an OR group and a join.
fn build_select(n: usize) -> SelectQb {
    let mut select = qb::select("users")
        .columns(&["u0.id", "u0.name", "u1.file"])
        .left_join("uploads", "users.id = uploads.user_id");
    for i in 0..n {
        select = select.eq(&format!("col{i}"), i as i64);
    }
    select
        .and_expr(Expr::or(vec![
            Expr::ilike("u0.name", "a%"),
            Expr::is_distinct_from("u0.email", "x@example.com"),
        ]))
        .order_by("u0.id DESC")
        .limit(20)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/build");

    for n in [1, 10, 50, 100] {
        let select = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(select.build_with_dialect(Dialect::Pgsql)));
        });
    }

    group.finish();
}

fn bench_dialects(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/dialects");
    let select = build_select(10);

    for dialect in Dialect::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(dialect), &dialect, |b, &dialect| {
            b.iter(|| black_box(select.build_with_dialect(dialect)));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/build_and_render");

    for n in [1, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n).build_with_dialect(Dialect::Mssql)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_dialects, bench_build_and_render);
criterion_main!(benches);
