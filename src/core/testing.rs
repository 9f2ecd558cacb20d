//! Scripted capabilities for unit tests

use crate::core::error::PublishError;
use crate::core::traits::{
    CommandOutput, CommandRunner, Invocation, OtpPrompter, PackageManager,
    PackageManagerDetector,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn stdout(text: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(1),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[derive(Clone)]
enum Response {
    Output(CommandOutput),
    SpawnFailure(String),
    NotAllowed,
}

struct Rule {
    prefix: String,
    responses: VecDeque<Response>,
}

/// Answers invocations from per-command queues; the last answer repeats
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for invocations whose rendering starts with `prefix`
    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        self.push(prefix, Response::Output(output))
    }

    /// Queue a spawn failure
    pub fn fail(self, prefix: &str, message: &str) -> Self {
        self.push(prefix, Response::SpawnFailure(message.to_string()))
    }

    /// Queue a whitelist rejection
    pub fn reject(self, prefix: &str) -> Self {
        self.push(prefix, Response::NotAllowed)
    }

    fn push(self, prefix: &str, response: Response) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|r| r.prefix == prefix) {
                Some(rule) => rule.responses.push_back(response),
                None => rules.push(Rule {
                    prefix: prefix.to_string(),
                    responses: VecDeque::from([response]),
                }),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.display().starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, PublishError> {
        self.calls.lock().unwrap().push(invocation.clone());
        tokio::task::yield_now().await;

        let rendered = invocation.display();
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .filter(|r| rendered.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());

        let response = match rule {
            Some(rule) if rule.responses.len() > 1 => rule.responses.pop_front(),
            Some(rule) => rule.responses.front().cloned(),
            None => None,
        };

        match response {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::SpawnFailure(message)) => Err(PublishError::Spawn {
                program: invocation.program.clone(),
                message,
            }),
            Some(Response::NotAllowed) => {
                Err(PublishError::CommandNotAllowed(invocation.program.clone()))
            }
            None => Err(PublishError::Spawn {
                program: invocation.program.clone(),
                message: format!("unscripted invocation: {}", rendered),
            }),
        }
    }
}

/// Always prefers the same package manager
pub struct FixedDetector(pub Option<PackageManager>);

#[async_trait]
impl PackageManagerDetector for FixedDetector {
    async fn preferred(&self, _cwd: &Path) -> Option<PackageManager> {
        self.0
    }
}

/// Hands out scripted answers and counts how often it was asked
pub struct CountingPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: AtomicUsize,
}

impl CountingPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpPrompter for CountingPrompter {
    async fn ask(&self, _question: &str) -> Result<String, PublishError> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PublishError::Prompt("no scripted answer left".to_string()))
    }
}
