use std::rc::Rc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trash::{Callable, Env, Evaluator, RuntimeError, Value, parse};

/// A `print` native that swallows its output.
struct SilentPrint;

impl Callable for SilentPrint {
    fn call(&self, _evaluator: &mut Evaluator, _args: Vec<Value>) -> Result<Value, RuntimeError> {
        Ok(Value::Nil)
    }
}

fn globals() -> Env {
    Env::with_bindings([(
        "print".to_string(),
        Value::Function(Rc::new(SilentPrint) as Rc<dyn Callable>),
    )])
}

fn bench_interpreter(c: &mut Criterion) {
    let fib = parse(
        "var fib = function(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }; \
         print(fib(15));",
    )
    .expect("parse");

    let loops = parse(
        "var total = 0; \
         for (var i = 0; i < 1000; i += 1) { total += i % 7; } \
         print(total);",
    )
    .expect("parse");

    let objects = parse(
        "var o = {}; \
         for (var i = 0; i < 200; i += 1) { o[i] = i * 2; } \
         var sum = 0; \
         for (var i = 0; i < 200; i += 1) { sum += o[i]; } \
         print(sum);",
    )
    .expect("parse");

    c.bench_function("interpreter_fib", |b| {
        b.iter(|| {
            Evaluator::new()
                .execute(black_box(&fib), globals())
                .expect("execute");
        })
    });

    c.bench_function("interpreter_loops", |b| {
        b.iter(|| {
            Evaluator::new()
                .execute(black_box(&loops), globals())
                .expect("execute");
        })
    });

    c.bench_function("interpreter_objects", |b| {
        b.iter(|| {
            Evaluator::new()
                .execute(black_box(&objects), globals())
                .expect("execute");
        })
    });
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
