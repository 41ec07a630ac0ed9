//! Trait describing the external value-selection collaborator.
//!
//! When a bonus description requires a choice (a free-form text, an attribute
//! or skill pick), the interpreter calls out through [`SelectionOracle`]. The
//! call is synchronous: the engine blocks until the collaborator returns a
//! value or signals cancellation. Hosts supply interactive implementations;
//! tests and batch tooling supply scripted ones.

/// Signals that the user (or scripted collaborator) declined to choose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("selection cancelled")]
pub struct SelectionCancelled;

/// Result of a single selection prompt.
pub type SelectionResult = Result<String, SelectionCancelled>;

/// External collaborator that resolves value selections for the interpreter.
///
/// Implementations must not mutate the character being improved while a
/// prompt is outstanding; the engine holds the only mutable borrow.
pub trait SelectionOracle {
    /// Asks for a free-form text value.
    ///
    /// `description` names the improvement source asking for the value and is
    /// intended for display to the user.
    fn select_text(&mut self, description: &str) -> SelectionResult;

    /// Asks for one entry out of `options`.
    ///
    /// Implementations should return one of the given options verbatim;
    /// anything else is treated as a free-form answer by the engine.
    fn select_from(&mut self, description: &str, options: &[String]) -> SelectionResult;
}
