//! Planning module for stack updates.
//!
//! This module handles everything that happens before a change set is
//! executed: diffing templates, creating and awaiting change sets, and
//! rendering their changes for review.

mod changes;
mod changeset;
mod diff;

pub use changes::ChangeFormatter;
pub use changeset::{CAPABILITIES, ChangeSetManager, ChangeSetOutcome};
pub use diff::{DiffEngine, DiffLine, DiffLineKind, TemplateDiff};
