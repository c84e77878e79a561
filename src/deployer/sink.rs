//! Presentation seam between the deployer and the console.

use crate::cloudformation::{CallerIdentity, StackEvent, StackOutput, StackStatus};
use crate::planner::DiffLine;

/// Receives everything a deploy run shows to the user.
///
/// Implementations decide how to render; the deployer only decides what and
/// when.
pub trait OutputSink {
    /// Announces a named value, e.g. the target stack or region.
    fn field(&self, name: &str, value: &str);

    /// Asks a yes/no question. Any cancelled or unreadable answer is a no.
    fn confirm(&self, prompt: &str) -> bool;

    /// Shows a rendered change set.
    fn change_set(&self, rendered: &str);

    /// Shows one template diff line.
    fn diff_line(&self, line: &DiffLine);

    /// Shows a failed resource event.
    fn stack_event(&self, event: &StackEvent);

    /// Announces a new stack status.
    fn status(&self, status: &StackStatus);

    /// Marks one poll without a status change.
    fn progress(&self);

    /// Shows a free-form message line.
    fn message(&self, text: &str);

    /// Shows the stack's declared outputs.
    fn stack_outputs(&self, outputs: &[StackOutput]);

    /// Shows the caller identity.
    fn identity(&self, identity: &CallerIdentity, region: Option<&str>);
}
