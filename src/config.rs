//! Build configuration and the definition store.
//!
//! The definition store is a string-keyed channel shared with external
//! consumers. Generation itself reads the typed [`ToolchainConfig`] filled
//! once by [`crate::generator::GlobalGenerator::enable_language`].

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::graph::FlagSet;

/// Definition naming the requested build configuration.
pub const BUILD_TYPE: &str = "BUILD_TYPE";
/// Definition mirroring the line continuation token.
pub const MAKE_LINE_CONTINUE: &str = "MAKE_LINE_CONTINUE";
/// Definition mirroring the symbolic rule marker.
pub const MAKE_SYMBOLIC_RULE: &str = "MAKE_SYMBOLIC_RULE";
/// Definition mirroring the include path quoting switch.
pub const QUOTE_INCLUDE_PATHS: &str = "QUOTE_INCLUDE_PATHS";
/// Definition mirroring the object name mangling switch.
pub const MANGLE_OBJECT_FILE_NAMES: &str = "MANGLE_OBJECT_FILE_NAMES";

/// Key/value store of named configuration variables.
pub trait DefinitionStore {
    /// Value of `name`, if defined.
    fn get_definition(&self, name: &str) -> Option<&str>;

    /// Define `name`, replacing any previous value.
    fn add_definition(&mut self, name: &str, value: &str);
}

/// Insertion-ordered [`DefinitionStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Definitions(IndexMap<String, String>);

impl Definitions {
    /// Iterate over definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DefinitionStore for Definitions {
    fn get_definition(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn add_definition(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_owned(), value.to_owned());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Definitions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A named build variant such as `Debug` or `Release`.
///
/// Names compare case-insensitively; the spelling used to select the
/// configuration is kept for display.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Configuration(String);

impl Configuration {
    /// Wrap a configuration name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Choose the active configuration for a single-config backend.
    ///
    /// An explicit request wins, then the [`BUILD_TYPE`] definition, then
    /// `default`. Blank values are skipped.
    #[must_use]
    pub fn select(requested: Option<&str>, store: &dyn DefinitionStore, default: &str) -> Self {
        fn non_blank(name: &str) -> Option<&str> {
            Some(name.trim()).filter(|trimmed| !trimmed.is_empty())
        }
        requested
            .and_then(non_blank)
            .or_else(|| store.get_definition(BUILD_TYPE).and_then(non_blank))
            .map_or_else(|| Self::new(default), Self::new)
    }

    /// The configuration name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this configuration is called `name`, ignoring case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source language a backend may drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Language {
    /// ISO C.
    C,
    /// C++.
    Cxx,
    /// Fortran.
    Fortran,
    /// Assembler.
    Asm,
}

impl Language {
    /// Canonical spelling used in definitions and manifests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cxx => "CXX",
            Self::Fortran => "Fortran",
            Self::Asm => "ASM",
        }
    }

    /// Name of the definition selecting this language's compiler, such as
    /// `GENERATOR_CC`.
    #[must_use]
    pub fn compiler_definition(self) -> String {
        let suffix = match self {
            Self::C => "CC",
            Self::Cxx => "CXX",
            Self::Fortran => "FORTRAN",
            Self::Asm => "ASM",
        };
        format!("GENERATOR_{suffix}")
    }

    /// Language of a source file judged by its extension.
    ///
    /// Headers and unknown extensions return `None`.
    #[must_use]
    pub fn for_source(path: &camino::Utf8Path) -> Option<Self> {
        let ext = path.extension()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" => Some(Self::C),
            "cc" | "cpp" | "cxx" | "c++" => Some(Self::Cxx),
            "f" | "for" | "f77" | "f90" | "f95" => Some(Self::Fortran),
            "s" | "asm" => Some(Self::Asm),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown language name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Self::C),
            "CXX" | "C++" => Ok(Self::Cxx),
            "FORTRAN" => Ok(Self::Fortran),
            "ASM" => Ok(Self::Asm),
            _ => Err(UnknownLanguage(s.to_owned())),
        }
    }
}

/// Command templates with `<PLACEHOLDER>` slots.
///
/// Recognised slots are `<COMPILER>`, `<FLAGS>`, `<DEFINES>`, `<INCLUDES>`,
/// `<OBJECT>`, `<SOURCE>`, `<TARGET>`, `<OBJECTS>`, `<LINK_FLAGS>` and
/// `<LINK_LIBRARIES>`. A list slot with leading text, such as `+<OBJECTS>`,
/// repeats the text before every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTemplates {
    /// Compile one source into one object.
    pub compile: &'static str,
    /// Archive objects into a static library.
    pub static_archive: &'static str,
    /// Link a shared library.
    pub shared_link: &'static str,
    /// Link an executable.
    pub executable_link: &'static str,
    /// Prefix turning a definition into a flag.
    pub define_flag: &'static str,
    /// Prefix turning a directory into an include flag.
    pub include_flag: &'static str,
}

/// File naming conventions of a toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingConvention {
    /// Suffix of object files.
    pub object_suffix: &'static str,
    /// Prefix of library files unless the policy suppresses it.
    pub library_prefix: &'static str,
    /// Suffix of static libraries.
    pub static_suffix: &'static str,
    /// Suffix of shared libraries.
    pub shared_suffix: &'static str,
    /// Suffix of executables.
    pub executable_suffix: &'static str,
}

/// Typed toolchain settings populated once when languages are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainConfig {
    /// Compiler command per enabled language.
    pub compilers: IndexMap<Language, String>,
    /// Whether object paths are flattened into unique names.
    pub mangle_object_names: bool,
    /// Whether include directories are always quoted.
    pub quote_include_paths: bool,
    /// Active build configuration.
    pub configuration: Configuration,
    /// Default flags per configuration name.
    pub config_flags: IndexMap<String, FlagSet>,
    /// Command templates.
    pub templates: RuleTemplates,
    /// File naming conventions.
    pub naming: NamingConvention,
}

impl ToolchainConfig {
    /// Compiler for `language`, if that language was enabled.
    #[must_use]
    pub fn compiler(&self, language: Language) -> Option<&str> {
        self.compilers.get(&language).map(String::as_str)
    }

    /// Whether `language` was enabled.
    #[must_use]
    pub fn is_enabled(&self, language: Language) -> bool {
        self.compilers.contains_key(&language)
    }

    /// Default flags of the active configuration.
    #[must_use]
    pub fn default_flags(&self) -> FlagSet {
        let mut flags = FlagSet::default();
        for (name, extra) in &self.config_flags {
            if self.configuration.matches(name) {
                flags.extend_from(extra);
            }
        }
        flags
    }
}
