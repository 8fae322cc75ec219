//! Host-provided subroutines installed into the global environment before
//! any user code runs.

use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::info;

use crate::environment::Environment;
use crate::error::{KestrelError, Result};
use crate::interpreter::Interpreter;
use crate::value::{Callable, Value};

/// Errors from native bodies carry no source position; the interpreter
/// rewrites line 0 to the call site.
type NativeResult = std::result::Result<Value, String>;

/// A built-in subroutine backed by a plain function pointer.
#[derive(Debug)]
pub struct NativeSubroutine {
    pub name: &'static str,

    /// `None` marks a variadic native that validates its own argument count.
    arity: Option<usize>,

    func: fn(&mut Interpreter, &[Value]) -> NativeResult,
}

impl Callable for NativeSubroutine {
    fn arity(&self) -> Option<usize> {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
        (self.func)(interpreter, args).map_err(|message| KestrelError::runtime(0, message))
    }
}

/// Define every native in the given (global) environment.
pub fn install(globals: &mut Environment) {
    info!("Installing native subroutines");

    let natives: &[NativeSubroutine] = &[
        NativeSubroutine {
            name: "clock",
            arity: Some(0),
            func: native_clock,
        },
        NativeSubroutine {
            name: "snooze",
            arity: Some(1),
            func: native_snooze,
        },
        NativeSubroutine {
            name: "print",
            arity: None,
            func: native_print,
        },
        NativeSubroutine {
            name: "input",
            arity: None,
            func: native_input,
        },
        NativeSubroutine {
            name: "round",
            arity: None,
            func: native_round,
        },
        NativeSubroutine {
            name: "string",
            arity: Some(1),
            func: native_string,
        },
        NativeSubroutine {
            name: "sqrt",
            arity: Some(1),
            func: native_sqrt,
        },
    ];

    for native in natives {
        globals.define(
            native.name,
            Value::Native(Rc::new(NativeSubroutine {
                name: native.name,
                arity: native.arity,
                func: native.func,
            })),
        );
    }
}

/// Seconds since the Unix epoch, as a fractional number.
fn native_clock(_: &mut Interpreter, _: &[Value]) -> NativeResult {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}.", e))?;

    Ok(Value::Number(now.as_secs_f64()))
}

/// Block the interpreter for the given number of seconds.
fn native_snooze(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    match args[0] {
        Value::Number(seconds) => {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|_| "Argument to 'snooze' must be a non-negative number.".to_owned())?;
            thread::sleep(duration);
            Ok(Value::Zilch)
        }
        _ => Err("Argument to 'snooze' must be a non-negative number.".to_owned()),
    }
}

/// Write every argument to stdout, space-separated, followed by a newline.
/// With no arguments, prints a blank line.
fn native_print(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for arg in args {
        write!(out, "{} ", arg).map_err(|e| e.to_string())?;
    }
    writeln!(out).map_err(|e| e.to_string())?;

    Ok(Value::Zilch)
}

/// Read one line from stdin, optionally printing a prompt first.
/// Returns `zilch` on end of input.
fn native_input(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    if args.len() > 1 {
        return Err("'input' takes at most one argument.".to_owned());
    }

    match args.first() {
        None => {}
        Some(Value::Str(prompt)) => {
            print!("{}", prompt);
            io::stdout().flush().map_err(|e| e.to_string())?;
        }
        Some(_) => return Err("Prompt must be a string.".to_owned()),
    }

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;

    if read == 0 {
        return Ok(Value::Zilch);
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(Value::Str(line))
}

/// Round half away from zero, optionally to a digit count:
/// `round(2.5)` is `3`, `round(3.14159, 2)` is `3.14`.
fn native_round(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    if args.is_empty() || args.len() > 2 {
        return Err("'round' takes one or two arguments.".to_owned());
    }

    let value = match args[0] {
        Value::Number(n) => n,
        _ => return Err("First argument to 'round' must be a number.".to_owned()),
    };

    let digits = match args.get(1) {
        None => 0.0,
        Some(Value::Number(d)) if d.fract() == 0.0 => *d,
        Some(_) => {
            return Err("Second argument to 'round' must be an integer.".to_owned());
        }
    };

    let factor = 10.0f64.powf(digits);
    Ok(Value::Number((value * factor).round() / factor))
}

/// Convert any value to its display string.
fn native_string(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    Ok(Value::Str(args[0].to_string()))
}

fn native_sqrt(_: &mut Interpreter, args: &[Value]) -> NativeResult {
    match args[0] {
        Value::Number(n) => Ok(Value::Number(n.sqrt())),
        _ => Err("Argument to 'sqrt' must be a number.".to_owned()),
    }
}
