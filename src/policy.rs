//! Generator policy records.
//!
//! A [`GeneratorPolicy`] is the set of textual and behavioural conventions a
//! makefile family must honour: how paths are spelled, how long lines are
//! continued, how phony targets are marked, and what the recipe shell can do.
//! Backends supply a policy as data; the generators never branch on which
//! backend produced it.
//!
//! Policies are assembled through [`GeneratorPolicyBuilder`], which rejects
//! empty tokens up front.
//!
//! ```
//! use makegen::policy::{GeneratorPolicy, PathConvention, PhonyStyle};
//!
//! let policy = GeneratorPolicy::builder()
//!     .path_convention(PathConvention::Windows)
//!     .line_continuation("&")
//!     .silent_flag("-h")
//!     .phony_style(PhonyStyle::Symbolic(".SYMBOLIC".into()))
//!     .include_directive("!include")
//!     .build()?;
//! assert_eq!(policy.line_continuation(), "&");
//! # Ok::<(), makegen::policy::PolicyError>(())
//! ```

#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// How directory separators are spelled in rendered paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathConvention {
    /// Forward slashes.
    Unix,
    /// Backslashes.
    Windows,
}

impl PathConvention {
    /// The separator character.
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows => '\\',
        }
    }
}

/// How rules without a file output are marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PhonyStyle {
    /// A marker appended after the prerequisites, e.g. `.SYMBOLIC`.
    Symbolic(String),
    /// A separate declaration listing phony names, e.g. `.PHONY`.
    PhonyTarget(String),
    /// The tool treats missing files as always out of date; no marker.
    Implicit,
}

/// A required policy knob is absent or malformed.
///
/// This signals a defect in a backend variant rather than in user input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("generator policy knob '{knob}' is misconfigured: {reason}")]
#[diagnostic(code(makegen::policy::misconfigured))]
pub struct PolicyError {
    /// Name of the offending knob.
    pub knob: &'static str,
    /// What the code path needed.
    pub reason: String,
}

/// Backend conventions consulted by every local generator.
///
/// Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorPolicy {
    path_convention: PathConvention,
    line_continuation: String,
    silent_flag: Option<String>,
    phony_style: PhonyStyle,
    ignore_lib_prefix: bool,
    include_directive: String,
    shell_has_cd: bool,
    command_separator: Option<String>,
    windows_shell: bool,
    define_windows_null: bool,
    mangle_object_names: bool,
    quote_include_paths: bool,
    pass_makeflags: bool,
    empty_rule_command: Option<String>,
    make_variable: String,
    tool_supports_color: bool,
}

impl GeneratorPolicy {
    /// Start a builder seeded with plain Unix make conventions.
    #[must_use]
    pub fn builder() -> GeneratorPolicyBuilder {
        GeneratorPolicyBuilder::default()
    }

    /// Separator convention for rendered paths.
    #[must_use]
    pub const fn path_convention(&self) -> PathConvention {
        self.path_convention
    }

    /// Token ending a line that continues on the next.
    #[must_use]
    pub fn line_continuation(&self) -> &str {
        &self.line_continuation
    }

    /// Flag injected after each build-tool invocation.
    #[must_use]
    pub fn silent_flag(&self) -> Option<&str> {
        self.silent_flag.as_deref()
    }

    /// Marking style for rules without outputs.
    #[must_use]
    pub const fn phony_style(&self) -> &PhonyStyle {
        &self.phony_style
    }

    /// Whether library file names omit the `lib` prefix.
    #[must_use]
    pub const fn ignore_lib_prefix(&self) -> bool {
        self.ignore_lib_prefix
    }

    /// Directive used to pull in another makefile.
    #[must_use]
    pub fn include_directive(&self) -> &str {
        &self.include_directive
    }

    /// Whether recipe lines may change directory.
    #[must_use]
    pub const fn shell_has_cd(&self) -> bool {
        self.shell_has_cd
    }

    /// Separator joining a `cd` with the command that follows it.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the policy allows `cd` but names no
    /// separator.
    pub fn command_separator(&self) -> Result<&str, PolicyError> {
        self.command_separator
            .as_deref()
            .ok_or_else(|| PolicyError {
                knob: "command_separator",
                reason: "a directory change needs a separator to join the next command".into(),
            })
    }

    /// Whether the recipe shell is Windows-family.
    #[must_use]
    pub const fn windows_shell(&self) -> bool {
        self.windows_shell
    }

    /// Whether makefiles define and reference a `NULL` variable.
    #[must_use]
    pub const fn define_windows_null(&self) -> bool {
        self.define_windows_null
    }

    /// Whether object paths are flattened into unique file names.
    #[must_use]
    pub const fn mangle_object_names(&self) -> bool {
        self.mangle_object_names
    }

    /// Whether include directories are always quoted.
    #[must_use]
    pub const fn quote_include_paths(&self) -> bool {
        self.quote_include_paths
    }

    /// Whether recursive invocations forward `$(MAKEFLAGS)`.
    #[must_use]
    pub const fn pass_makeflags(&self) -> bool {
        self.pass_makeflags
    }

    /// Command emitted for rules that would otherwise have none.
    #[must_use]
    pub fn empty_rule_command(&self) -> Option<&str> {
        self.empty_rule_command.as_deref()
    }

    /// Spelling of a recursive tool invocation, e.g. `$(MAKE)`.
    #[must_use]
    pub fn make_variable(&self) -> &str {
        &self.make_variable
    }

    /// Whether the native tool may colourise output.
    #[must_use]
    pub const fn tool_supports_color(&self) -> bool {
        self.tool_supports_color
    }

    /// Name of the null device for the recipe shell.
    #[must_use]
    pub const fn null_device(&self) -> &'static str {
        if self.windows_shell { "nul" } else { "/dev/null" }
    }
}

/// Builder for [`GeneratorPolicy`].
#[derive(Debug, Clone)]
pub struct GeneratorPolicyBuilder {
    policy: GeneratorPolicy,
}

impl Default for GeneratorPolicyBuilder {
    fn default() -> Self {
        Self {
            policy: GeneratorPolicy {
                path_convention: PathConvention::Unix,
                line_continuation: "\\".into(),
                silent_flag: None,
                phony_style: PhonyStyle::PhonyTarget(".PHONY".into()),
                ignore_lib_prefix: false,
                include_directive: "include".into(),
                shell_has_cd: true,
                command_separator: Some("&&".into()),
                windows_shell: false,
                define_windows_null: false,
                mangle_object_names: false,
                quote_include_paths: false,
                pass_makeflags: false,
                empty_rule_command: None,
                make_variable: "$(MAKE)".into(),
                tool_supports_color: false,
            },
        }
    }
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: bool) => {
        $(#[$doc])*
        #[must_use]
        pub const fn $name(mut self, value: bool) -> Self {
            self.policy.$name = value;
            self
        }
    };
    ($(#[$doc:meta])* $name:ident: String) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.policy.$name = value.into();
            self
        }
    };
    ($(#[$doc:meta])* $name:ident: Option<String>) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.policy.$name = Some(value.into());
            self
        }
    };
}

impl GeneratorPolicyBuilder {
    /// Set the path separator convention.
    #[must_use]
    pub const fn path_convention(mut self, value: PathConvention) -> Self {
        self.policy.path_convention = value;
        self
    }

    /// Set the phony marking style.
    #[must_use]
    pub fn phony_style(mut self, value: PhonyStyle) -> Self {
        self.policy.phony_style = value;
        self
    }

    /// Forbid directory changes in recipes and drop the separator.
    #[must_use]
    pub fn without_cd(mut self) -> Self {
        self.policy.shell_has_cd = false;
        self.policy.command_separator = None;
        self
    }

    setter!(
        /// Set the line continuation token.
        line_continuation: String
    );
    setter!(
        /// Set the flag injected after build-tool invocations.
        silent_flag: Option<String>
    );
    setter!(
        /// Suppress the `lib` prefix on library names.
        ignore_lib_prefix: bool
    );
    setter!(
        /// Set the makefile include directive.
        include_directive: String
    );
    setter!(
        /// Declare whether recipe lines may change directory.
        shell_has_cd: bool
    );
    setter!(
        /// Set the separator joining `cd` with the next command.
        command_separator: Option<String>
    );
    setter!(
        /// Declare a Windows-family recipe shell.
        windows_shell: bool
    );
    setter!(
        /// Define and reference a `NULL` makefile variable.
        define_windows_null: bool
    );
    setter!(
        /// Flatten object paths into unique names.
        mangle_object_names: bool
    );
    setter!(
        /// Always quote include directories.
        quote_include_paths: bool
    );
    setter!(
        /// Forward `$(MAKEFLAGS)` to recursive invocations.
        pass_makeflags: bool
    );
    setter!(
        /// Set the command used for otherwise empty rules.
        empty_rule_command: Option<String>
    );
    setter!(
        /// Set the spelling of a recursive tool invocation.
        make_variable: String
    );
    setter!(
        /// Declare whether the native tool supports colour.
        tool_supports_color: bool
    );

    /// Validate and return the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when a token knob is empty.
    pub fn build(self) -> Result<GeneratorPolicy, PolicyError> {
        let policy = self.policy;
        require_non_empty("line_continuation", Some(&policy.line_continuation))?;
        require_non_empty("include_directive", Some(&policy.include_directive))?;
        require_non_empty("make_variable", Some(&policy.make_variable))?;
        require_non_empty("silent_flag", policy.silent_flag.as_ref())?;
        require_non_empty("command_separator", policy.command_separator.as_ref())?;
        require_non_empty("empty_rule_command", policy.empty_rule_command.as_ref())?;
        match &policy.phony_style {
            PhonyStyle::Symbolic(marker) | PhonyStyle::PhonyTarget(marker) => {
                require_non_empty("phony_style", Some(marker))?;
            }
            PhonyStyle::Implicit => {}
        }
        Ok(policy)
    }
}

fn require_non_empty(knob: &'static str, value: Option<&String>) -> Result<(), PolicyError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(PolicyError {
            knob,
            reason: "token must not be empty".into(),
        }),
        _ => Ok(()),
    }
}
