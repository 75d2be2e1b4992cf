//! I/O boundary traits for testability
//!
//! These traits abstract file access and the external text-generation
//! collaborators, allowing services to be tested with stub implementations.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::process::Output;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::application::request::ExpansionRequest;
use crate::application::validators::judge_prompt;
use crate::domain::LegalElement;
use crate::infrastructure::error::{InfraError, InfraResult, ProducerError};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments, feeding `stdin` and capturing output.
    fn run_with_stdin(&self, cmd: &str, args: &[String], stdin: &str) -> io::Result<Output>;
}

/// Generates child lines for a node.
///
/// Returns the raw response text; parsing into a typed proposal happens in
/// the caller.
pub trait ContentProducer: Send + Sync {
    fn propose_children(&self, request: &ExpansionRequest) -> Result<String, ProducerError>;
}

/// Outcome of a semantic leakage check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgement {
    pub accepted: bool,
    pub rationale: String,
}

impl Judgement {
    pub fn accept(rationale: impl Into<String>) -> Self {
        Self {
            accepted: true,
            rationale: rationale.into(),
        }
    }

    pub fn reject(rationale: impl Into<String>) -> Self {
        Self {
            accepted: false,
            rationale: rationale.into(),
        }
    }
}

/// Judges whether a candidate deduction leaks proof of another legal element.
pub trait SemanticJudge: Send + Sync {
    fn judge(
        &self,
        element: LegalElement,
        case_description: &str,
        candidate: &str,
    ) -> Result<Judgement, ProducerError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_with_stdin(&self, cmd: &str, args: &[String], stdin: &str) -> io::Result<Output> {
        use std::io::Write;
        use std::process::Stdio;

        let mut child = std::process::Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin concurrently so a chatty child cannot fill stdout and stall.
        let child_stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match child_stdin {
                Some(mut pipe) => match pipe.write_all(stdin.as_bytes()) {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                },
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output?;
        written?;
        Ok(output)
    }
}

/// Runs `cmd` up to `attempts` times until it exits successfully.
fn call_with_retries(
    runner: &dyn CommandRunner,
    cmd: &str,
    args: &[String],
    stdin: &str,
    attempts: u32,
) -> Result<String, ProducerError> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match runner.run_with_stdin(cmd, args, stdin) {
            Ok(output) if output.status.success() => {
                return String::from_utf8(output.stdout)
                    .map_err(|e| ProducerError::Transient(format!("non-UTF-8 output: {e}")));
            }
            Ok(output) => {
                last_error = format!(
                    "{} exited with {}: {}",
                    cmd,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => last_error = format!("spawn {cmd}: {e}"),
        }
        warn!("transport attempt {attempt}/{attempts} failed: {last_error}");
    }
    Err(ProducerError::Exhausted {
        attempts,
        message: last_error,
    })
}

/// Producer backed by an external command.
///
/// The rendered prompt goes to the command's stdin; stdout is the response.
pub struct CommandProducer {
    runner: Arc<dyn CommandRunner>,
    command: String,
    args: Vec<String>,
    transport_attempts: u32,
}

impl CommandProducer {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command: impl Into<String>,
        args: Vec<String>,
        transport_attempts: u32,
    ) -> Self {
        Self {
            runner,
            command: command.into(),
            args,
            transport_attempts,
        }
    }
}

impl ContentProducer for CommandProducer {
    fn propose_children(&self, request: &ExpansionRequest) -> Result<String, ProducerError> {
        debug!("propose_children: command={} node={}", self.command, request.node_text);
        call_with_retries(
            self.runner.as_ref(),
            &self.command,
            &self.args,
            &request.to_prompt(),
            self.transport_attempts,
        )
    }
}

/// Judge backed by an external command answering Yes (leaks) or No.
pub struct CommandJudge {
    runner: Arc<dyn CommandRunner>,
    command: String,
    args: Vec<String>,
    transport_attempts: u32,
}

impl CommandJudge {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command: impl Into<String>,
        args: Vec<String>,
        transport_attempts: u32,
    ) -> Self {
        Self {
            runner,
            command: command.into(),
            args,
            transport_attempts,
        }
    }

    /// Interpret a free-text answer; the first word decides.
    pub fn parse_verdict(answer: &str) -> Result<Judgement, ProducerError> {
        let trimmed = answer.trim();
        let first = trimmed
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .unwrap_or("")
            .to_lowercase();
        match first.as_str() {
            "no" => Ok(Judgement::accept(trimmed)),
            "yes" => Ok(Judgement::reject(trimmed)),
            _ => Err(ProducerError::Transient(format!(
                "unrecognised judge answer: {trimmed}"
            ))),
        }
    }
}

impl SemanticJudge for CommandJudge {
    fn judge(
        &self,
        element: LegalElement,
        case_description: &str,
        candidate: &str,
    ) -> Result<Judgement, ProducerError> {
        let prompt = judge_prompt(element, case_description, candidate);
        let answer = call_with_retries(
            self.runner.as_ref(),
            &self.command,
            &self.args,
            &prompt,
            self.transport_attempts,
        )?;
        Self::parse_verdict(&answer)
    }
}

/// Replays canned responses in order; used for offline runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedProducer {
    responses: Mutex<VecDeque<String>>,
}

/// Separator line between responses in a replay script.
pub const SCRIPT_SEPARATOR: &str = "---";

impl ScriptedProducer {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a script of responses separated by `---` lines.
    pub fn from_script(script: &str) -> InfraResult<Self> {
        let mut responses = Vec::new();
        let mut current = Vec::new();
        for line in script.lines() {
            if line.trim() == SCRIPT_SEPARATOR {
                responses.push(current.join("\n"));
                current.clear();
            } else {
                current.push(line);
            }
        }
        if current.iter().any(|l| !l.trim().is_empty()) {
            responses.push(current.join("\n"));
        }
        if responses.is_empty() {
            return Err(InfraError::Replay {
                message: "script contains no responses".to_string(),
            });
        }
        Ok(Self::new(responses))
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl ContentProducer for ScriptedProducer {
    fn propose_children(&self, request: &ExpansionRequest) -> Result<String, ProducerError> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|e| ProducerError::Transient(format!("script lock poisoned: {e}")))?;
        queue.pop_front().ok_or_else(|| ProducerError::Exhausted {
            attempts: 1,
            message: format!("replay script exhausted at node: {}", request.node_text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("No. The deduction only concerns the treaty.", true)]
    #[case("  yes, it references revenue", false)]
    #[case("NO", true)]
    fn given_answer_when_parsing_verdict_then_first_word_decides(
        #[case] answer: &str,
        #[case] accepted: bool,
    ) {
        assert_eq!(CommandJudge::parse_verdict(answer).unwrap().accepted, accepted);
    }

    #[test]
    fn given_unclear_answer_when_parsing_verdict_then_transient_error() {
        let result = CommandJudge::parse_verdict("maybe");
        assert!(matches!(result, Err(ProducerError::Transient(_))));
    }

    #[test]
    fn given_script_when_parsing_then_splits_on_separator() {
        let script = "a | Fact From Story\nb | Fact From Story\n---\nc | Commonsense Knowledge\n";
        let producer = ScriptedProducer::from_script(script).unwrap();
        assert_eq!(producer.remaining(), 2);
    }

    #[test]
    fn given_empty_script_when_parsing_then_errors() {
        assert!(ScriptedProducer::from_script("\n\n").is_err());
    }
}
