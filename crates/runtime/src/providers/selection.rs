//! Non-interactive implementations of the selection collaborator.

use std::collections::VecDeque;

use character_core::{SelectionCancelled, SelectionOracle, SelectionResult};

/// Answers prompts from a pre-scripted queue, cancelling once it runs dry.
///
/// The workhorse for batch imports and tests: script the answers the content
/// is known to ask for, and any unexpected prompt aborts the grant cleanly.
#[derive(Debug, Default)]
pub struct ScriptedSelection {
    answers: VecDeque<String>,
}

impl ScriptedSelection {
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl SelectionOracle for ScriptedSelection {
    fn select_text(&mut self, _description: &str) -> SelectionResult {
        self.answers.pop_front().ok_or(SelectionCancelled)
    }

    fn select_from(&mut self, _description: &str, _options: &[String]) -> SelectionResult {
        self.answers.pop_front().ok_or(SelectionCancelled)
    }
}

/// Cancels every prompt.
#[derive(Debug, Default)]
pub struct DenyAllSelection;

impl SelectionOracle for DenyAllSelection {
    fn select_text(&mut self, _description: &str) -> SelectionResult {
        Err(SelectionCancelled)
    }

    fn select_from(&mut self, _description: &str, _options: &[String]) -> SelectionResult {
        Err(SelectionCancelled)
    }
}

/// Takes the first offered option; cancels free-form prompts.
#[derive(Debug, Default)]
pub struct FirstOptionSelection;

impl SelectionOracle for FirstOptionSelection {
    fn select_text(&mut self, _description: &str) -> SelectionResult {
        Err(SelectionCancelled)
    }

    fn select_from(&mut self, _description: &str, options: &[String]) -> SelectionResult {
        options.first().cloned().ok_or(SelectionCancelled)
    }
}
