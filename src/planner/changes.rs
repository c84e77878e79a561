//! Human-readable rendering of change set descriptions.

use std::fmt::Write;

use crate::cloudformation::{
    Change, ChangeAction, ChangeDetail, Replacement, RequiresRecreation, ResourceChange,
};

/// Renders change set entries as text.
///
/// Every entry is preceded by a blank line and keeps the order the service
/// returned. Output is a pure function of the input.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeFormatter;

impl ChangeFormatter {
    /// Creates a new formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders all changes.
    #[must_use]
    pub fn format(&self, changes: &[Change]) -> String {
        let mut out = String::new();
        for change in changes {
            out.push('\n');
            match &change.resource_change {
                Some(resource) => Self::format_resource(&mut out, resource),
                None => {
                    let _ = writeln!(out, "? {}", change.change_type);
                }
            }
        }
        out
    }

    fn format_resource(out: &mut String, change: &ResourceChange) {
        let kind = &change.resource_type;
        let id = &change.logical_resource_id;

        match &change.action {
            ChangeAction::Add => {
                let _ = writeln!(out, "+ {kind} {id}");
            }
            ChangeAction::Remove => {
                let _ = writeln!(out, "- {kind} {id}");
            }
            ChangeAction::Modify if change.replacement == Replacement::True => {
                let _ = writeln!(out, "- {kind} {id}");
                let _ = writeln!(out, "+ {kind} {id}");
                if let Some(physical_id) = &change.physical_resource_id {
                    let _ = writeln!(out, "  Resource: {physical_id}");
                }
            }
            ChangeAction::Modify => {
                let _ = writeln!(out, "~ {kind} {id}");
                for detail in &change.details {
                    let _ = writeln!(out, "    Change: {}", Self::format_detail(detail));
                }
            }
            _ => {
                let _ = writeln!(out, "? {kind} {id}");
            }
        }
    }

    /// Renders one detail as `<target> <- <source>[ (annotation)]`.
    fn format_detail(detail: &ChangeDetail) -> String {
        let target = match (&detail.target.attribute, &detail.target.name) {
            (Some(attribute), Some(name)) => format!("{attribute}.{name}"),
            (Some(attribute), None) => attribute.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::from("?"),
        };

        let causing = detail.causing_entity.as_deref();
        let source = match (detail.change_source.as_deref(), causing) {
            (Some("ResourceAttribute"), Some(entity)) => format!("!GetAtt {entity}"),
            (Some("ResourceReference" | "ParameterReference"), Some(entity)) => {
                format!("!Ref {entity}")
            }
            (Some(source), Some(entity)) => format!("{source} {entity}"),
            (Some(source), None) => source.to_string(),
            (None, Some(entity)) => entity.to_string(),
            (None, None) => String::from("?"),
        };

        let annotation = match detail.target.requires_recreation {
            RequiresRecreation::Never => "",
            RequiresRecreation::Conditionally => " (conditional replacement)",
            RequiresRecreation::Always => " (forces replacement)",
        };

        format!("{target} <- {source}{annotation}")
    }
}
