//! Yes/no confirmation before destructive operations.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Asks the user to confirm an operation.
pub trait Prompter: Send + Sync {
    /// Returns true when the user agrees.
    fn confirm(&self, message: &str) -> bool;
}

/// Answers every prompt the same way without asking anyone.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl AutoConfirm {
    pub fn yes() -> Self {
        Self(true)
    }

    pub fn no() -> Self {
        Self(false)
    }
}

impl Prompter for AutoConfirm {
    fn confirm(&self, message: &str) -> bool {
        tracing::debug!("auto-answering {} to: {message}", if self.0 { "yes" } else { "no" });
        self.0
    }
}

/// Replays queued answers and records every question asked.
///
/// Once the queue is empty it answers with the fallback.
#[derive(Debug)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
    fallback: bool,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
            fallback,
        }
    }

    /// Questions asked so far, oldest first.
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn times_asked(&self) -> usize {
        self.asked.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str) -> bool {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
