#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use umi_assist_core::{AssistError, CompletionPort, Result};

/// Pipeline stage a prompt belongs to, recognized by its opening line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Classify,
    Extract,
    SelectApi,
    SelectFields,
    RequestPayload,
    EventPayload,
    FollowUp,
    OperationQuestion,
    Answer,
    Unknown,
}

impl Stage {
    pub fn of(prompt: &str) -> Stage {
        let p = prompt.trim_start();
        if p.starts_with("You route messages") {
            Stage::Classify
        } else if p.starts_with("Extract the details") {
            Stage::Extract
        } else if p.starts_with("Pick the UMI API") {
            Stage::SelectApi
        } else if p.starts_with("Selected API:") {
            Stage::SelectFields
        } else if p.starts_with("Generate a sample REQUEST payload") {
            Stage::RequestPayload
        } else if p.starts_with("Generate a sample JSON event payload") {
            Stage::EventPayload
        } else if p.starts_with("Rewrite the following request") {
            Stage::FollowUp
        } else if p.starts_with("The user wants to build") {
            Stage::OperationQuestion
        } else if p.starts_with("You are the assistant for the UMI") {
            Stage::Answer
        } else {
            Stage::Unknown
        }
    }
}

/// Completion port answering from per-stage queues.
///
/// A stage with an empty queue uses its default reply, or fails when it has none.
#[derive(Default)]
pub struct ScriptedCompletion {
    queues: Mutex<HashMap<Stage, VecDeque<String>>>,
    defaults: HashMap<Stage, String>,
    calls: Mutex<Vec<(Stage, String, f32)>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, stage: Stage, reply: &str) -> Self {
        self.defaults.insert(stage, reply.to_string());
        self
    }

    pub fn push(&self, stage: Stage, reply: &str) {
        self.queues
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(reply.to_string());
    }

    pub fn calls(&self) -> Vec<(Stage, String, f32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls().into_iter().map(|(s, _, _)| s).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let stage = Stage::of(prompt);
        self.calls
            .lock()
            .unwrap()
            .push((stage, prompt.to_string(), temperature));

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(|q| q.pop_front());
        queued
            .or_else(|| self.defaults.get(&stage).cloned())
            .ok_or_else(|| AssistError::Completion(format!("no scripted reply for {stage:?}")))
    }
}
