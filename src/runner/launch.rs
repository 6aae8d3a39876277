//! Command lines for the test runner
//!
//! A [`Launch`] is the program, arguments and extra environment used to
//! start the runner. Instrumentation sessions contribute [`Wrapper`]s that
//! re-host the launch under an interpreter module such as `coverage run`.

use std::path::Path;

/// A program invocation, not yet spawned
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Launch {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run this launch under `wrapper`.
    ///
    /// When the launch already runs under the wrapper's interpreter, the
    /// wrapper's module arguments are spliced in front of the existing ones
    /// so chained modules share one interpreter
    /// (`python3 -m coverage run -m cProfile ...`). The launch may name the
    /// interpreter by a resolved path, so programs are matched by file name.
    pub fn wrap(self, wrapper: &Wrapper) -> Self {
        let mut args = wrapper.module_args.clone();
        if !same_program(&self.program, &wrapper.interpreter) {
            args.push(self.program);
        }
        args.extend(self.args);

        let mut env = self.env;
        env.extend(wrapper.env.iter().cloned());

        Self {
            program: wrapper.interpreter.clone(),
            args,
            env,
        }
    }

    /// Shell-style rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn same_program(a: &str, b: &str) -> bool {
    a == b || Path::new(a).file_name() == Path::new(b).file_name()
}

/// Interpreter-hosted wrapper contributed by an instrumentation session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wrapper {
    pub interpreter: String,
    pub module_args: Vec<String>,
    pub env: Vec<(String, String)>,
}
