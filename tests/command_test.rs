//! Tests for the command-backed producer and judge
#![cfg(unix)]

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};

use deductree::application::{ExpansionRequest, Guideline};
use deductree::domain::{ExpansionLevel, LegalElement};
use deductree::infrastructure::{
    CommandJudge, CommandProducer, CommandRunner, ContentProducer, ProducerError,
    RealCommandRunner, SemanticJudge,
};

/// Replays canned process outputs and records what was sent on stdin.
struct StubRunner {
    outputs: Mutex<Vec<io::Result<Output>>>,
    stdin: Mutex<Vec<String>>,
}

impl StubRunner {
    fn new(outputs: Vec<io::Result<Output>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into_iter().rev().collect()),
            stdin: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.stdin.lock().unwrap().len()
    }
}

impl CommandRunner for StubRunner {
    fn run_with_stdin(&self, _cmd: &str, _args: &[String], stdin: &str) -> io::Result<Output> {
        self.stdin.lock().unwrap().push(stdin.to_string());
        self.outputs
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::NotFound, "no more outputs")))
    }
}

fn output(code: i32, stdout: &str) -> io::Result<Output> {
    Ok(Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: b"upstream unavailable".to_vec(),
    })
}

fn request() -> ExpansionRequest {
    ExpansionRequest {
        node_text: "Applicable law is clear for Acme's arrangement.".to_string(),
        element: LegalElement::Law,
        level: ExpansionLevel::L1L2,
        guideline: Guideline::new("Describe the legal characteristics."),
        case_description: "Taxpayer: Acme".to_string(),
        tree_rendering: "root\n> Applicable law is clear for Acme's arrangement.".to_string(),
        feedback: Vec::new(),
    }
}

#[test]
fn given_successful_command_when_proposing_then_returns_stdout_and_sends_prompt() {
    // Arrange
    let runner = StubRunner::new(vec![output(0, "> a | Fact From Story")]);
    let producer = CommandProducer::new(runner.clone(), "llm", vec![], 3);

    // Act
    let response = producer.propose_children(&request()).unwrap();

    // Assert
    assert_eq!(response, "> a | Fact From Story");
    let sent = runner.stdin.lock().unwrap();
    assert!(sent[0].contains("Describe the legal characteristics."));
    assert!(sent[0].contains("Applicable law is clear for Acme's arrangement."));
}

#[test]
fn given_one_failed_run_when_proposing_then_transport_retry_succeeds() {
    // Arrange
    let runner = StubRunner::new(vec![output(1, ""), output(0, "ok")]);
    let producer = CommandProducer::new(runner.clone(), "llm", vec![], 3);

    // Act
    let response = producer.propose_children(&request()).unwrap();

    // Assert
    assert_eq!(response, "ok");
    assert_eq!(runner.calls(), 2);
}

#[test]
fn given_failing_command_when_attempts_used_up_then_exhausted() {
    // Arrange
    let runner = StubRunner::new(vec![output(1, ""), output(1, ""), output(1, "")]);
    let producer = CommandProducer::new(runner.clone(), "llm", vec![], 3);

    // Act
    let err = producer.propose_children(&request()).unwrap_err();

    // Assert
    assert!(err.is_fatal());
    assert!(matches!(err, ProducerError::Exhausted { attempts: 3, .. }));
    assert!(err.to_string().contains("upstream unavailable"));
    assert_eq!(runner.calls(), 3);
}

#[test]
fn given_missing_binary_when_proposing_then_exhausted_with_spawn_message() {
    // Arrange
    let producer = CommandProducer::new(
        Arc::new(RealCommandRunner),
        "deductree-no-such-binary",
        vec![],
        1,
    );

    // Act
    let err = producer.propose_children(&request()).unwrap_err();

    // Assert
    assert!(err.to_string().contains("spawn deductree-no-such-binary"));
}

#[test]
fn given_no_answer_when_judging_then_accepts_and_prompt_names_other_elements() {
    // Arrange
    let runner = StubRunner::new(vec![output(0, "No. The facts only describe the treaty.")]);
    let judge = CommandJudge::new(runner.clone(), "judge", vec![], 1);

    // Act
    let judgement = judge
        .judge(LegalElement::Law, "Taxpayer: Acme", "- a\nTherefore: b")
        .unwrap();

    // Assert
    assert!(judgement.accepted);
    let sent = runner.stdin.lock().unwrap();
    assert!(sent[0].contains("economic activity"));
    assert!(sent[0].contains("procedural requirements"));
}

#[test]
fn given_yes_answer_when_judging_then_rejects_with_rationale() {
    // Arrange
    let runner = StubRunner::new(vec![output(0, "Yes, it mentions revenue.")]);
    let judge = CommandJudge::new(runner, "judge", vec![], 1);

    // Act
    let judgement = judge
        .judge(LegalElement::Law, "Taxpayer: Acme", "- revenue rose")
        .unwrap();

    // Assert
    assert!(!judgement.accepted);
    assert_eq!(judgement.rationale, "Yes, it mentions revenue.");
}

#[test]
fn given_unrecognised_answer_when_judging_then_transient() {
    // Arrange
    let runner = StubRunner::new(vec![output(0, "Perhaps.")]);
    let judge = CommandJudge::new(runner, "judge", vec![], 1);

    // Act
    let result = judge.judge(LegalElement::Econ, "Taxpayer: Acme", "- a");

    // Assert
    assert!(matches!(result, Err(ProducerError::Transient(_))));
}

#[test]
fn given_child_writing_large_output_before_reading_when_running_then_completes() {
    // Arrange
    let prompt = "x".repeat(1 << 20);
    let args = vec![
        "-c".to_string(),
        "head -c 262144 /dev/zero; cat > /dev/null".to_string(),
    ];

    // Act
    let output = RealCommandRunner.run_with_stdin("sh", &args, &prompt).unwrap();

    // Assert
    assert!(output.status.success());
    assert_eq!(output.stdout.len(), 262_144);
}

#[test]
fn given_child_ignoring_stdin_when_running_then_output_returned() {
    // Arrange
    let prompt = "x".repeat(1 << 20);
    let args = vec!["-c".to_string(), "echo done".to_string()];

    // Act
    let output = RealCommandRunner.run_with_stdin("sh", &args, &prompt).unwrap();

    // Assert
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "done");
}
