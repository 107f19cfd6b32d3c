//! Whole-project makefile generation.
//!
//! [`GlobalGenerator`] drives one backend through a fixed lifecycle:
//!
//! ```text
//! Uninitialized --enable_language--> LanguageEnabled
//!   --generate--> DirectoriesGenerated --write--> Written
//! ```
//!
//! [`GlobalGenerator::reset`] returns to `Uninitialized` for
//! reconfiguration. Every fatal error is raised before any file is written,
//! so a failed run leaves the build tree untouched.

mod error;
mod tree;
mod write;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::Utf8Path;
use indexmap::IndexMap;
use itertools::Itertools;
use tracing::{debug, info};

use crate::backend::{Backend, BuildCommand, BuildRequest};
use crate::config::{
    BUILD_TYPE, Configuration, DefinitionStore, Language, MAKE_LINE_CONTINUE,
    MAKE_SYMBOLIC_RULE, MANGLE_OBJECT_FILE_NAMES, QUOTE_INCLUDE_PATHS, ToolchainConfig,
};
use crate::graph::TargetId;
use crate::local_gen::{CommandSpec, GeneratorContext, LocalGenerator, OutputRegistry};
use crate::policy::{GeneratorPolicy, PhonyStyle};
use crate::project::Project;

pub use error::GenerateError;
pub use tree::GeneratedTree;
pub use write::{STAMP_DIR, STAMP_FILE, WriteReport, stamp_path};

/// Lifecycle position of a [`GlobalGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// No language enabled yet.
    Uninitialized,
    /// Toolchain populated; ready to generate.
    LanguageEnabled,
    /// Makefiles rendered in memory.
    DirectoriesGenerated,
    /// Makefiles written to the build tree.
    Written,
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::LanguageEnabled => "language-enabled",
            Self::DirectoriesGenerated => "directories-generated",
            Self::Written => "written",
        })
    }
}

/// Generates a makefile tree for one backend.
#[derive(Debug)]
pub struct GlobalGenerator {
    backend: &'static Backend,
    policy: GeneratorPolicy,
    configuration: Option<String>,
    toolchain: Option<ToolchainConfig>,
    state: GeneratorState,
    cancel: Arc<AtomicBool>,
}

impl GlobalGenerator {
    /// Generator for `backend` using the backend's own policy.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::PolicyMisconfiguration`] when the backend's
    /// policy is malformed.
    pub fn new(backend: &'static Backend) -> Result<Self, GenerateError> {
        Ok(Self::with_policy(backend, backend.policy()?))
    }

    /// Generator for `backend` with an explicit policy.
    #[must_use]
    pub fn with_policy(backend: &'static Backend, policy: GeneratorPolicy) -> Self {
        Self {
            backend,
            policy,
            configuration: None,
            toolchain: None,
            state: GeneratorState::Uninitialized,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request a build configuration; otherwise [`BUILD_TYPE`] or the
    /// backend default applies.
    #[must_use]
    pub fn with_configuration(mut self, name: Option<String>) -> Self {
        self.configuration = name;
        self
    }

    /// The backend driven by this generator.
    #[must_use]
    pub const fn backend(&self) -> &'static Backend {
        self.backend
    }

    /// The policy applied to every directory.
    #[must_use]
    pub const fn policy(&self) -> &GeneratorPolicy {
        &self.policy
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> GeneratorState {
        self.state
    }

    /// Toolchain populated by [`Self::enable_language`].
    #[must_use]
    pub const fn toolchain(&self) -> Option<&ToolchainConfig> {
        self.toolchain.as_ref()
    }

    /// Flag that cancels generation at the next directory boundary.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Backend name and one-line description.
    #[must_use]
    pub const fn documentation(&self) -> (&'static str, &'static str) {
        self.backend.documentation()
    }

    /// Script name used to locate the native make program.
    #[must_use]
    pub const fn make_program_file(&self) -> &'static str {
        self.backend.make_program_file
    }

    /// Compose the native build command for `request`.
    #[must_use]
    pub fn build_command(&self, request: &BuildRequest<'_>) -> BuildCommand {
        self.backend
            .invocation()
            .compose(request, self.backend.make_program)
    }

    /// Enable `languages`, publish the backend's definitions into `store`
    /// and populate the toolchain.
    ///
    /// A compiler already defined in the store under
    /// `GENERATOR_<LANG>` overrides the backend default.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidState`] unless the generator is
    /// uninitialised, and [`GenerateError::UnsupportedLanguage`] before any
    /// definition is touched when a language is unknown to the backend.
    pub fn enable_language<S: AsRef<str>>(
        &mut self,
        languages: &[S],
        store: &mut dyn DefinitionStore,
    ) -> Result<(), GenerateError> {
        self.expect_state(GeneratorState::Uninitialized, "enable languages")?;
        let mut requested: Vec<(Language, &'static str)> = Vec::new();
        for name in languages {
            let name = name.as_ref();
            let found = name
                .parse::<Language>()
                .ok()
                .and_then(|l| self.backend.toolchain.compiler(l).map(|c| (l, c)))
                .ok_or_else(|| self.unsupported(name))?;
            if !requested.iter().any(|(l, _)| *l == found.0) {
                requested.push(found);
            }
        }

        let mut compilers = IndexMap::new();
        for (language, default) in requested {
            let key = language.compiler_definition();
            let compiler = store
                .get_definition(&key)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(default)
                .to_owned();
            store.add_definition(&key, &compiler);
            compilers.insert(language, compiler);
        }
        self.publish_policy(store);
        for (name, value) in self.backend.toolchain.definitions {
            store.add_definition(name, value);
        }

        let configuration = Configuration::select(
            self.configuration.as_deref(),
            store,
            self.backend.toolchain.default_configuration,
        );
        store.add_definition(BUILD_TYPE, configuration.name());
        info!(
            generator = self.backend.name,
            languages = %compilers.keys().join(", "),
            configuration = %configuration,
            "enabled languages"
        );
        self.toolchain = Some(self.backend.toolchain.instantiate(
            compilers,
            configuration,
            &self.policy,
        ));
        self.state = GeneratorState::LanguageEnabled;
        Ok(())
    }

    /// Lower and render every directory of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Graph`] for dangling edges and cycles,
    /// [`GenerateError::Cancelled`] when the cancellation token was set, and
    /// any lowering or rendering failure. Nothing is written.
    pub fn generate(&mut self, project: &Project) -> Result<GeneratedTree, GenerateError> {
        self.expect_state(GeneratorState::LanguageEnabled, "generate")?;
        let toolchain = self.toolchain.as_ref().ok_or(GenerateError::InvalidState {
            operation: "generate",
            state: self.state,
        })?;
        let graph = &project.graph;
        graph.resolve()?;
        let order: Vec<TargetId> = graph
            .topological_order()?
            .filter_map(|target| graph.find(target.name()))
            .collect();

        let mut outputs = OutputRegistry::default();
        for (dir, _) in graph.directories().iter() {
            outputs.register_directory(graph, dir, toolchain, &self.policy);
        }
        let ctx = GeneratorContext {
            graph,
            toolchain,
            outputs: &outputs,
            order: &order,
            source_root: &project.source_root,
            makefile_name: self.backend.makefile_name,
            generator_name: self.backend.name,
            project: &project.name,
        };

        let mut tree = GeneratedTree::default();
        for (dir, _) in graph.directories().iter() {
            if self.cancel.load(Ordering::SeqCst) {
                info!("generation cancelled");
                return Err(GenerateError::Cancelled);
            }
            let mut local = LocalGenerator::new(ctx, dir)?;
            local.configure(&self.policy);
            local.lower_all()?;
            let path = local.path().to_owned();
            for (_, target) in graph.targets_in(dir) {
                for argv in project.post_build_steps(target.name()) {
                    local.add_rule(target.name(), CommandSpec::from_argv(argv, &path))?;
                }
            }
            tree.insert(local.makefile_path(), &local.render()?);
            for (flags_path, lines) in local.render_flags()? {
                tree.insert(flags_path, &lines);
            }
            for out_dir in local.output_directories() {
                tree.require_directory(out_dir);
            }
            debug!(directory = %display_dir(&path), "generated directory");
        }
        self.state = GeneratorState::DirectoriesGenerated;
        Ok(tree)
    }

    /// Write `tree` under `build_dir`, touching only files whose content
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidState`] unless directories were
    /// generated, and [`GenerateError::Io`] when a file cannot be written.
    pub fn write(
        &mut self,
        tree: &GeneratedTree,
        build_dir: &Utf8Path,
    ) -> Result<WriteReport, GenerateError> {
        self.expect_state(GeneratorState::DirectoriesGenerated, "write")?;
        let report = write::write_tree(tree, build_dir)?;
        info!(
            build_dir = %build_dir,
            written = report.written.len(),
            unchanged = report.unchanged,
            "build tree written"
        );
        self.state = GeneratorState::Written;
        Ok(report)
    }

    /// Return to [`GeneratorState::Uninitialized`], dropping the toolchain
    /// and clearing cancellation.
    pub fn reset(&mut self) {
        self.toolchain = None;
        self.cancel.store(false, Ordering::SeqCst);
        self.state = GeneratorState::Uninitialized;
    }

    fn expect_state(
        &self,
        expected: GeneratorState,
        operation: &'static str,
    ) -> Result<(), GenerateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GenerateError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn unsupported(&self, language: &str) -> GenerateError {
        GenerateError::UnsupportedLanguage {
            generator: self.backend.name,
            language: language.to_owned(),
            supported: self
                .backend
                .toolchain
                .compilers
                .iter()
                .map(|(l, _)| l.as_str())
                .join(", "),
        }
    }

    /// Mirror the policy knobs consumers read by name.
    fn publish_policy(&self, store: &mut dyn DefinitionStore) {
        let policy = &self.policy;
        store.add_definition(MAKE_LINE_CONTINUE, policy.line_continuation());
        match policy.phony_style() {
            PhonyStyle::Symbolic(marker) | PhonyStyle::PhonyTarget(marker) => {
                store.add_definition(MAKE_SYMBOLIC_RULE, marker);
            }
            PhonyStyle::Implicit => {}
        }
        store.add_definition(QUOTE_INCLUDE_PATHS, flag(policy.quote_include_paths()));
        store.add_definition(
            MANGLE_OBJECT_FILE_NAMES,
            flag(policy.mangle_object_names()),
        );
    }
}

const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn display_dir(path: &Utf8Path) -> &str {
    if path.as_str().is_empty() {
        "."
    } else {
        path.as_str()
    }
}
