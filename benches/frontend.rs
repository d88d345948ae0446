use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trash::{lexer, parser};

/// A source text exercising every statement form and precedence level.
fn sample_program(repeats: usize) -> String {
    let unit = r#"
        var total = 0;
        var o = { x: 1, ["y"]: 2 };
        var step = function(n) { return n + o.x * 2 - o["y"] / 4; };
        for (var i = 0; i < 10; i += 1) {
            if (i % 2 == 0) continue;
            total += step(i);
        }
        while (total > 100) { total -= 7; }
        print(total && true || !false ^ nil == nil);
    "#;
    unit.repeat(repeats)
}

fn bench_frontend(c: &mut Criterion) {
    let source = sample_program(32);

    c.bench_function("frontend_tokenize", |b| {
        b.iter(|| {
            let out = lexer::tokenize(black_box(&source)).expect("tokenize");
            black_box(out);
        })
    });

    c.bench_function("frontend_parse", |b| {
        b.iter(|| {
            let out = parser::parse(black_box(&source)).expect("parse");
            black_box(out);
        })
    });
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
