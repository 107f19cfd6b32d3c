//! Composition of native build-tool command lines.

use std::fmt;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::quote::{QuoteError, ShellFlavor, quote};

/// Inputs to a native build invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest<'a> {
    /// Program to run; `None` selects the backend default.
    pub program: Option<&'a str>,
    /// Target to build; `None` builds the default goal.
    pub target: Option<&'a str>,
    /// Configuration requested by the caller.
    pub configuration: Option<&'a str>,
    /// Number of parallel jobs.
    pub parallel: Option<usize>,
    /// Extra flags forwarded to the tool, split with shell-word rules.
    pub extra_flags: &'a [String],
}

/// A composed native build command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Quoting rules of the shell that will read [`Self::to_command_line`].
    pub flavor: ShellFlavor,
}

impl BuildCommand {
    /// Render the command as one line quoted for its shell.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError`] when an argument cannot be quoted.
    pub fn to_command_line(&self) -> Result<String, QuoteError> {
        let words = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|word| quote(word, self.flavor))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words.iter().join(" "))
    }
}

/// Backend-specific composition of the native build command.
pub trait BuildToolInvocation: fmt::Debug + Send + Sync {
    /// Compose the command for `request`, using `default_program` when the
    /// request names none.
    fn compose(&self, request: &BuildRequest<'_>, default_program: &str) -> BuildCommand;
}

/// Split each extra flag string into shell words.
///
/// A string that does not split cleanly is forwarded verbatim.
pub(super) fn split_extra_flags(extra: &[String]) -> Vec<String> {
    extra
        .iter()
        .flat_map(|flags| {
            shlex::split(flags).unwrap_or_else(|| {
                warn!(flags = %flags, "unbalanced quoting in extra build flags; forwarding verbatim");
                vec![flags.clone()]
            })
        })
        .collect()
}

pub(super) fn note_configuration(request: &BuildRequest<'_>) {
    if let Some(config) = request.configuration {
        debug!(
            configuration = %config,
            "makefile backends fix the configuration at generation time"
        );
    }
}

/// Arguments shared by every makefile tool: `leading`, the split extra
/// flags, then the target.
pub(super) fn tool_args(leading: &[&str], jobs: Option<usize>, request: &BuildRequest<'_>) -> Vec<String> {
    let mut args: Vec<String> = leading.iter().map(|s| (*s).to_owned()).collect();
    if let Some(n) = jobs {
        args.push("-j".to_owned());
        args.push(n.to_string());
    }
    args.extend(split_extra_flags(request.extra_flags));
    args.extend(request.target.map(str::to_owned));
    args
}
