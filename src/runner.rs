#![allow(clippy::module_name_repetitions)]
//! Command Runner: the single seam through which dockertools talks to the
//! container runtime and the registry.
//!
//! Every component takes `&dyn CommandRunner`. Production uses [`SystemRunner`]
//! (real subprocesses); tests use [`ScriptedRunner`], which answers from a
//! script and records the exact call sequence.
//!
//! Both backends keep a [`Transcript`] of every invocation in issuance order.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use tracing::debug;

use crate::util::exec::{ExecRequest, ExecService};
use crate::util::shell_join;

/// Result of one external invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// One recorded call: program plus exact argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// `program arg arg ...` with shell escaping, for logs and previews.
    pub fn preview(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.clone());
        words.extend(self.args.iter().cloned());
        shell_join(&words)
    }

    /// `program arg arg ...` joined with plain spaces, the shape a logging shim would record.
    pub fn plain(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Ordered log of invocations.
#[derive(Debug, Default)]
pub struct Transcript {
    calls: Mutex<Vec<Invocation>>,
}

impl Transcript {
    pub fn record(&self, program: &str, args: &[String]) {
        let inv = Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        };
        debug!(command = %inv.preview(), "runner invocation");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(inv);
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` verbatim and wait for it.
    ///
    /// `Err` means the process could not be started; a non-zero exit is `Ok`.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Every invocation issued so far, oldest first.
    fn transcript(&self) -> Vec<Invocation>;
}

/// Real subprocess backend.
#[derive(Debug, Default)]
pub struct SystemRunner {
    exec: ExecService,
    transcript: Transcript,
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self {
            exec: ExecService::new(),
            transcript: Transcript::default(),
            verbose,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.transcript.record(program, args);
        if self.verbose {
            let preview = Invocation {
                program: program.to_string(),
                args: args.to_vec(),
            }
            .preview();
            eprintln!("dockertools: exec: {preview}");
        }
        let out = self.exec.run(ExecRequest::new(program).args(args))?;
        debug!(
            program,
            exit_code = out.code(),
            elapsed_ms = out.duration.as_millis() as u64,
            "runner invocation finished"
        );
        Ok(CommandOutput {
            exit_code: out.code(),
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }

    fn transcript(&self) -> Vec<Invocation> {
        self.transcript.calls()
    }
}

/// How a scripted rule decides whether it applies to a call.
#[derive(Debug, Clone)]
enum Matcher {
    /// Leading arguments must equal these, in order.
    Prefix(Vec<String>),
    /// The plain-joined argument string must contain this.
    Contains(String),
}

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    SpawnError(String),
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    matcher: Matcher,
    response: Response,
}

/// Scriptable test backend.
///
/// Rules are checked in insertion order; the first match answers. Calls with
/// no matching rule succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    transcript: Transcript,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls whose leading args equal `prefix`.
    pub fn on(mut self, program: &str, prefix: &[&str], response: CommandOutput) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            matcher: Matcher::Prefix(prefix.iter().map(|s| s.to_string()).collect()),
            response: Response::Output(response),
        });
        self
    }

    /// Answer calls whose space-joined args contain `needle`.
    pub fn on_contains(mut self, program: &str, needle: &str, response: CommandOutput) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            matcher: Matcher::Contains(needle.to_string()),
            response: Response::Output(response),
        });
        self
    }

    /// Make calls whose leading args equal `prefix` fail to spawn.
    pub fn fail_spawn(mut self, program: &str, prefix: &[&str], message: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            matcher: Matcher::Prefix(prefix.iter().map(|s| s.to_string()).collect()),
            response: Response::SpawnError(message.to_string()),
        });
        self
    }

    /// Plain-joined `program args...` lines, in call order.
    pub fn log(&self) -> Vec<String> {
        self.transcript.calls().iter().map(Invocation::plain).collect()
    }

    fn find(&self, program: &str, args: &[String]) -> Option<&Rule> {
        let joined = args.join(" ");
        self.rules.iter().find(|r| {
            r.program == program
                && match &r.matcher {
                    Matcher::Prefix(p) => args.len() >= p.len() && args[..p.len()] == p[..],
                    Matcher::Contains(n) => joined.contains(n.as_str()),
                }
        })
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.transcript.record(program, args);
        match self.find(program, args).map(|r| &r.response) {
            Some(Response::Output(out)) => Ok(out.clone()),
            Some(Response::SpawnError(msg)) => Err(anyhow::anyhow!("{msg}")),
            None => Ok(CommandOutput::default()),
        }
    }

    fn transcript(&self) -> Vec<Invocation> {
        self.transcript.calls()
    }
}

/// Convenience: owned argument vector from string slices.
pub fn argv<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().map(|s| s.as_ref().to_string()).collect()
}
