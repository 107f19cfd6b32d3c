//! Backend variants.
//!
//! A [`Backend`] is a static descriptor: display name, documentation, a
//! policy constructor, toolchain defaults and one behavioural strategy for
//! composing the native build command. The generators consume these as data
//! and never branch on which backend they were given.

mod invocation;
mod nmake;
mod unix;
mod watcom;

use std::fmt;

use indexmap::IndexMap;

use crate::config::{Configuration, Language, NamingConvention, RuleTemplates, ToolchainConfig};
use crate::graph::FlagSet;
use crate::policy::{GeneratorPolicy, PolicyError};

pub use invocation::{BuildCommand, BuildRequest, BuildToolInvocation};
pub use nmake::NMAKE;
pub use unix::UNIX_MAKEFILES;
pub use watcom::WATCOM_WMAKE;

/// Default flags for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfigDefaults {
    /// Configuration name.
    pub name: &'static str,
    /// Compile flags.
    pub compile: &'static [&'static str],
    /// Preprocessor definitions.
    pub defines: &'static [&'static str],
    /// Link flags.
    pub link: &'static [&'static str],
}

impl ConfigDefaults {
    fn flag_set(&self) -> FlagSet {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect();
        FlagSet {
            compile: owned(self.compile),
            link: owned(self.link),
            defines: owned(self.defines),
            include_dirs: Vec::new(),
        }
    }
}

/// Toolchain facts a backend ships with.
#[derive(Debug, Clone)]
pub struct ToolchainDefaults {
    /// Supported languages with their default compiler command.
    pub compilers: &'static [(Language, &'static str)],
    /// Command templates.
    pub templates: RuleTemplates,
    /// File naming conventions.
    pub naming: NamingConvention,
    /// Default configuration when none is requested.
    pub default_configuration: &'static str,
    /// Per-configuration default flags.
    pub config_flags: &'static [ConfigDefaults],
    /// Marker definitions published when a language is enabled.
    pub definitions: &'static [(&'static str, &'static str)],
}

impl ToolchainDefaults {
    /// Default compiler for `language`, or `None` when unsupported.
    #[must_use]
    pub fn compiler(&self, language: Language) -> Option<&'static str> {
        self.compilers
            .iter()
            .find(|(lang, _)| *lang == language)
            .map(|(_, compiler)| *compiler)
    }

    /// Assemble the typed toolchain record for the given compilers.
    #[must_use]
    pub fn instantiate(
        &self,
        compilers: IndexMap<Language, String>,
        configuration: Configuration,
        policy: &GeneratorPolicy,
    ) -> ToolchainConfig {
        ToolchainConfig {
            compilers,
            mangle_object_names: policy.mangle_object_names(),
            quote_include_paths: policy.quote_include_paths(),
            configuration,
            config_flags: self
                .config_flags
                .iter()
                .map(|c| (c.name.to_owned(), c.flag_set()))
                .collect(),
            templates: self.templates.clone(),
            naming: self.naming.clone(),
        }
    }
}

/// A makefile family the generator can target.
pub struct Backend {
    /// Display name, e.g. `Watcom WMake`.
    pub name: &'static str,
    /// Identifier accepted on the command line.
    pub slug: &'static str,
    /// One-line description for listings.
    pub brief: &'static str,
    /// Name of the script locating the native make program.
    pub make_program_file: &'static str,
    /// Native make program run when no override is given.
    pub make_program: &'static str,
    /// File name of each generated directory makefile.
    pub makefile_name: &'static str,
    /// Toolchain defaults.
    pub toolchain: ToolchainDefaults,
    policy: fn() -> Result<GeneratorPolicy, PolicyError>,
    invocation: &'static dyn BuildToolInvocation,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("slug", &self.slug)
            .field("invocation", &self.invocation)
            .finish_non_exhaustive()
    }
}

static ALL: [&Backend; 3] = [&WATCOM_WMAKE, &UNIX_MAKEFILES, &NMAKE];

impl Backend {
    /// Every shipped backend in listing order.
    #[must_use]
    pub fn all() -> &'static [&'static Self] {
        &ALL
    }

    /// Find a backend by slug or display name, ignoring case.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        let wanted = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|b| b.slug.eq_ignore_ascii_case(wanted) || b.name.eq_ignore_ascii_case(wanted))
    }

    /// Name and one-line description.
    #[must_use]
    pub const fn documentation(&self) -> (&'static str, &'static str) {
        (self.name, self.brief)
    }

    /// Build the backend's policy record.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the backend's own knobs are malformed.
    pub fn policy(&self) -> Result<GeneratorPolicy, PolicyError> {
        (self.policy)()
    }

    /// The strategy composing native build commands.
    #[must_use]
    pub fn invocation(&self) -> &'static dyn BuildToolInvocation {
        self.invocation
    }

    /// Whether the backend can drive `language`.
    #[must_use]
    pub fn supports(&self, language: Language) -> bool {
        self.toolchain.compiler(language).is_some()
    }
}
