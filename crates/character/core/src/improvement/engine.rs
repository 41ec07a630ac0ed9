//! The improvement engine: context object and transactional interpretation.
//!
//! One engine value bundles the aggregation cache, the in-flight transaction
//! list, and the selection-forcing state that used to be ambient. Hosts keep
//! one engine per document (or per character set) and route every record
//! mutation through it; the engine supports one active transaction at a
//! time.

use tracing::debug;

use crate::character::Character;
use crate::selection::SelectionOracle;

use super::bonus::BonusNode;
use super::cache::ValueCache;
use super::kind::{ImprovementKind, ImprovementSource};
use super::record::Improvement;

/// Why a bonus application did not commit.
///
/// Every variant has already been rolled back by the time the caller sees
/// it: the owner's collection is exactly as it was before the call. Nothing
/// here is fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// The selection collaborator declined to choose.
    #[error("selection cancelled")]
    Cancelled,
    /// A handler found its domain precondition unmet.
    #[error("bonus application aborted: {reason}")]
    Aborted { reason: String },
    /// A bonus node with children matched no registered directive. This is a
    /// data-authoring defect, not a runtime fault.
    #[error("unknown bonus directive: {tag}")]
    UnknownTag { tag: String },
    /// A directive node is missing a required child element.
    #[error("bonus directive `{tag}` is missing required element `{field}`")]
    MissingData { tag: String, field: &'static str },
}

/// Rollback key for one record created in the current transaction.
#[derive(Clone, Debug)]
pub(crate) struct TransactionEntry {
    pub source: ImprovementSource,
    pub source_name: String,
    pub kind: ImprovementKind,
}

/// Borrowed state threaded through one interpretation pass.
pub(crate) struct ApplyContext<'a> {
    pub character: &'a mut Character,
    pub selection: &'a mut dyn SelectionOracle,
    pub source: ImprovementSource,
    /// Mutable: a concatenated selection becomes part of the source name for
    /// every record created after the select-text directive resolves.
    pub source_name: String,
    /// Grouping tag from the bonus root's `unique` attribute.
    pub unique: String,
    pub rating: i32,
    pub friendly_name: String,
    pub concat_selected: bool,
}

/// Explicit context object owning the cache, transaction list, and
/// selection-forcing state.
#[derive(Default)]
pub struct ImprovementEngine {
    pub(crate) cache: ValueCache,
    pub(crate) transaction: Vec<TransactionEntry>,
    pub(crate) forced_value: String,
    pub(crate) limit_selection: String,
    pub(crate) selected_value: String,
}

impl ImprovementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the next selection prompt to resolve to this value without
    /// consulting the selection collaborator.
    pub fn set_forced_value(&mut self, value: impl Into<String>) {
        self.forced_value = value.into();
    }

    /// Restricts what the next prompt may return to a single value.
    pub fn set_limit_selection(&mut self, value: impl Into<String>) {
        self.limit_selection = value.into();
    }

    /// The value chosen by the most recent selection, for display.
    pub fn selected_value(&self) -> &str {
        &self.selected_value
    }

    /// Marks the cached total for (owner, kind) stale.
    pub fn invalidate(&mut self, owner: &Character, kind: ImprovementKind) {
        self.cache.invalidate(owner.id, kind);
    }

    /// Drops every cache entry for an owner. Call when discarding a
    /// character.
    pub fn forget_owner(&mut self, owner: &Character) {
        self.cache.invalidate_all(owner.id);
    }

    /// Applies a declarative bonus tree to `owner`, all-or-nothing.
    ///
    /// On success every record created by the tree's directives is committed
    /// to the owner's collection and the owner receives one batched change
    /// notification. On any failure (cancelled selection, handler abort,
    /// unknown directive) every record created during this call is removed
    /// again, keyed by (source, source name), before the error returns.
    ///
    /// A missing bonus tree and a missing owner both succeed as no-ops; the
    /// latter allows detached sub-objects to run their construction path
    /// before being attached to a character.
    #[allow(clippy::too_many_arguments)]
    pub fn create_improvements(
        &mut self,
        owner: Option<&mut Character>,
        selection: &mut dyn SelectionOracle,
        source: ImprovementSource,
        source_name: &str,
        bonus: Option<&BonusNode>,
        concat_selected: bool,
        rating: i32,
        friendly_name: &str,
    ) -> Result<(), ApplyError> {
        let Some(node) = bonus else {
            self.forced_value.clear();
            self.limit_selection.clear();
            return Ok(());
        };
        self.selected_value.clear();

        let Some(character) = owner else {
            debug!(
                target: "character_core::improvement",
                source = %source,
                source_name,
                "no owner, skipping bonus application"
            );
            return Ok(());
        };

        let friendly = if friendly_name.is_empty() {
            source_name
        } else {
            friendly_name
        };
        let mut ctx = ApplyContext {
            character,
            selection,
            source,
            source_name: source_name.to_string(),
            unique: node.attr("unique").unwrap_or_default().to_string(),
            rating,
            friendly_name: friendly.to_string(),
            concat_selected,
        };

        let result = self.apply_tree(&mut ctx, node);
        match result {
            Ok(()) => {
                self.commit(ctx.character);
                self.forced_value.clear();
                self.limit_selection.clear();
                Ok(())
            }
            Err(error) => {
                self.rollback(ctx.character);
                self.forced_value.clear();
                self.limit_selection.clear();
                Err(error)
            }
        }
    }

    fn apply_tree(&mut self, ctx: &mut ApplyContext<'_>, node: &BonusNode) -> Result<(), ApplyError> {
        if node.children.is_empty() {
            return Ok(());
        }
        if node.find("selecttext").is_some() {
            self.resolve_select_text(ctx)?;
        }
        for child in &node.children {
            // Already handled above, before any other directive ran.
            if child.tag == "selecttext" {
                continue;
            }
            self.process_bonus(ctx, child)?;
        }
        Ok(())
    }

    /// Record-construction primitive.
    ///
    /// Appends to the owner's collection and the transaction list, and
    /// invalidates the cache entry for (owner, kind) immediately: handlers
    /// later in the same pass may query aggregate totals before the whole
    /// transaction commits.
    pub fn create_improvement(&mut self, character: &mut Character, improvement: Improvement) {
        self.cache.invalidate(character.id, improvement.kind());
        self.transaction.push(TransactionEntry {
            source: improvement.source(),
            source_name: improvement.source_name().to_string(),
            kind: improvement.kind(),
        });
        character.improvements.push(improvement);
    }

    fn commit(&mut self, character: &mut Character) {
        character.change_counter.batches += 1;
        self.transaction.clear();
    }

    pub(crate) fn rollback(&mut self, character: &mut Character) {
        let entries = std::mem::take(&mut self.transaction);
        for entry in &entries {
            self.remove_improvements(character, entry.source, Some(&entry.source_name));
            self.cache.invalidate(character.id, entry.kind);
        }
    }
}
