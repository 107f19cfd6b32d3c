//! Backend-neutral rule records.

use serde::Serialize;

use super::command::{CommandSpec, Location};
use crate::graph::TargetId;

/// A prerequisite of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Prerequisite {
    /// A file in the source or build tree.
    File(Location),
    /// The output file of a named target.
    TargetFile(String),
    /// Another rule of the same makefile, by name.
    Rule(String),
}

/// One build step lowered from a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Target the rule belongs to; `None` for directory-level rules.
    pub target: Option<TargetId>,
    /// File produced; `None` marks a symbolic rule called [`Rule::name`].
    pub output: Option<Location>,
    /// Name of a symbolic rule.
    pub name: String,
    /// Files consumed by the commands.
    pub inputs: Vec<Location>,
    /// Further prerequisites after the inputs.
    pub prerequisites: Vec<Prerequisite>,
    /// Rules that must finish first, listed before every other
    /// prerequisite. Only symbolic rules carry them.
    pub order_only: Vec<String>,
    /// Commands in order.
    pub commands: Vec<CommandSpec>,
    /// Comment rendered above the rule.
    pub comment: Option<String>,
}

impl Rule {
    /// A file rule producing `output`.
    #[must_use]
    pub fn file(target: Option<TargetId>, output: Location) -> Self {
        Self {
            target,
            output: Some(output),
            name: String::new(),
            inputs: Vec::new(),
            prerequisites: Vec::new(),
            order_only: Vec::new(),
            commands: Vec::new(),
            comment: None,
        }
    }

    /// A symbolic rule called `name`.
    #[must_use]
    pub fn symbolic(target: Option<TargetId>, name: impl Into<String>) -> Self {
        Self {
            target,
            output: None,
            name: name.into(),
            inputs: Vec::new(),
            prerequisites: Vec::new(),
            order_only: Vec::new(),
            commands: Vec::new(),
            comment: None,
        }
    }

    /// Whether the rule has no file output.
    #[must_use]
    pub const fn is_symbolic(&self) -> bool {
        self.output.is_none()
    }

    /// Attach a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
