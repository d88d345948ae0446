use std::fs;
use std::io::{self, Read};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use trash::{Callable, Env, Evaluator, RuntimeError, Value, parse};

/// Stdout-backed `print` native registered for programs run by the CLI.
struct PrintNative;

impl Callable for PrintNative {
    fn call(
        &self,
        _evaluator: &mut Evaluator,
        args: Vec<Value>,
    ) -> std::result::Result<Value, RuntimeError> {
        let rendered = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("{rendered}");
        Ok(Value::Nil)
    }
}

fn main() -> Result<()> {
    let mut dump_ast = false;
    let mut script: Option<String> = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dump-ast" => dump_ast = true,
            _ if script.is_some() => bail!("expected at most one script file"),
            _ => script = Some(arg),
        }
    }

    let source = match &script {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read script {path}"))?
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read program from stdin")?;
            source
        }
    };

    let program = parse(&source)?;

    if dump_ast {
        println!("{program:#?}");
        return Ok(());
    }

    let globals = Env::with_bindings([(
        "print".to_string(),
        Value::Function(Rc::new(PrintNative) as Rc<dyn Callable>),
    )]);
    Evaluator::new().execute(&program, globals)?;
    Ok(())
}
