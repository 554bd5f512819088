use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tua::{Evaluator, Parser, Scanner};

fn pipeline_benchmark(c: &mut Criterion) {
    let source = r#"
        function square(n: int): int return n * n end

        let total: int = 0
        for i = 1, i <= 100, 1 do
            total = total + square(i)
        end

        let xs: List[int] = {}
        for i = 0, i < 50, 1 do
            append(xs, i * 2)
        end
        let sum: int = 0
        for k, v in ipairs(xs) do
            sum = sum + v
        end
    "#;

    c.bench_function("tokenize program", |b| {
        b.iter(|| Scanner::new(black_box(source)).scan_tokens().unwrap())
    });

    c.bench_function("parse program", |b| {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        b.iter(|| Parser::new(black_box(tokens.clone())).parse().unwrap())
    });

    c.bench_function("execute program", |b| {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        b.iter(|| {
            let mut evaluator = Evaluator::new();
            evaluator.execute(black_box(&program)).unwrap();
        })
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
