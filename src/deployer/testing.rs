//! Test doubles shared by the deployer tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::cloudformation::{
    CallerIdentity, Stack, StackEvent, StackOutput, StackStatus,
};
use crate::planner::DiffLine;

use super::sink::OutputSink;

/// Something the deployer showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Field(String, String),
    Prompt(String),
    ChangeSet(String),
    Diff(String),
    Event(String),
    Status(String),
    Progress,
    Message(String),
    Outputs(Vec<String>),
    Identity(String),
}

/// Records output and answers prompts from a script.
#[derive(Debug, Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<Shown>>,
    answers: Mutex<VecDeque<bool>>,
}

impl RecordingSink {
    /// Answers prompts with `answers` in order, then with no.
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            shown: Mutex::default(),
            answers: Mutex::new(answers.iter().copied().collect()),
        }
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Prompt(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Status(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, shown: Shown) {
        self.shown.lock().unwrap().push(shown);
    }
}

impl OutputSink for RecordingSink {
    fn field(&self, name: &str, value: &str) {
        self.push(Shown::Field(name.to_string(), value.to_string()));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.push(Shown::Prompt(prompt.to_string()));
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }

    fn change_set(&self, rendered: &str) {
        self.push(Shown::ChangeSet(rendered.to_string()));
    }

    fn diff_line(&self, line: &DiffLine) {
        self.push(Shown::Diff(line.text.clone()));
    }

    fn stack_event(&self, event: &StackEvent) {
        self.push(Shown::Event(format!(
            "{} {}",
            event.logical_resource_id, event.resource_status
        )));
    }

    fn status(&self, status: &StackStatus) {
        self.push(Shown::Status(status.to_string()));
    }

    fn progress(&self) {
        self.push(Shown::Progress);
    }

    fn message(&self, text: &str) {
        self.push(Shown::Message(text.to_string()));
    }

    fn stack_outputs(&self, outputs: &[StackOutput]) {
        self.push(Shown::Outputs(
            outputs
                .iter()
                .map(|o| format!("{}={}", o.key, o.value))
                .collect(),
        ));
    }

    fn identity(&self, identity: &CallerIdentity, region: Option<&str>) {
        self.push(Shown::Identity(format!(
            "{} {}",
            identity.account,
            region.unwrap_or("-")
        )));
    }
}

pub fn stack(name: &str, status: &str) -> Stack {
    Stack {
        stack_id: Some(format!("arn:aws:cloudformation:eu-west-1:123456789012:stack/{name}/1")),
        stack_name: name.to_string(),
        status: StackStatus::new(status),
        status_reason: None,
        outputs: vec![],
    }
}

pub fn event(logical_id: &str, status: &str, timestamp: DateTime<Utc>) -> StackEvent {
    StackEvent {
        event_id: format!("{logical_id}-{status}"),
        timestamp,
        logical_resource_id: logical_id.to_string(),
        resource_type: String::from("AWS::SQS::Queue"),
        resource_status: status.to_string(),
        resource_status_reason: Some(String::from("Resource creation cancelled")),
    }
}
