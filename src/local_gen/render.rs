//! Rendering lowered rules as makefile text.
//!
//! Policy is applied while rendering, in this order: the Windows `NULL`
//! definition, object-name mangling, silent-flag injection on invocation
//! commands, symbolic marking of rules without outputs, and `cd`
//! suppression with relative-path composition.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::command::{CommandKind, CommandSpec, Location, Token};
use super::paths::{PathComposer, make_identifier, object_name};
use super::registry::OutputEntry;
use super::rule::{Prerequisite, Rule};
use super::{LocalGenerator, TargetFlags};
use crate::generator::GenerateError;
use crate::graph::SUBDIRECTORY_RULE_PREFIX;
use crate::policy::{GeneratorPolicy, PhonyStyle};
use crate::quote::{ShellFlavor, double_quote, escape_make, quote};

/// Column at which prerequisite lists and commands are continued.
const LINE_WIDTH: usize = 78;

/// Per-render state: the policy, the composer and the output lines.
struct Renderer<'a> {
    policy: &'a GeneratorPolicy,
    composer: PathComposer<'a>,
    makefile_name: &'a str,
    lines: Vec<String>,
}

impl LocalGenerator<'_> {
    /// Render the directory makefile.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::PolicyMisconfiguration`] when no policy was
    /// configured or a knob is missing, and
    /// [`GenerateError::UnresolvedDependency`] when a rule references an
    /// unknown target.
    pub fn render(&self) -> Result<Vec<String>, GenerateError> {
        let mut renderer = self.renderer()?;
        self.write_header(&mut renderer);
        if renderer.policy.define_windows_null() {
            renderer.lines.push("NULL = nul".to_owned());
            renderer.lines.push(String::new());
        }

        let owner = self.display_name();
        let subdirs = self.subdirectory_rules();
        let mut all = Rule::symbolic(None, "all").with_comment("Default goal");
        all.prerequisites.extend(
            self.blocks
                .keys()
                .cloned()
                .chain(subdirs.iter().map(|r| r.name.clone()))
                .map(Prerequisite::Rule),
        );
        renderer.rule(self, &all, &owner)?;

        for block in self.blocks.values() {
            renderer.lines.push(format!("# Target: {}", block.name));
            if let Some(flags) = &block.flags {
                let include = renderer
                    .composer
                    .render(&Location::build(flags.file.clone()));
                renderer.lines.push(format!(
                    "{} {}",
                    renderer.policy.include_directive(),
                    path_word(include)
                ));
            }
            renderer.lines.push(String::new());
            for rule in &block.rules {
                renderer.rule(self, rule, &block.name)?;
            }
        }

        for rule in self.foreign.values().chain(subdirs.iter()) {
            renderer.rule(self, rule, &owner)?;
        }
        let clean = self.clean_rule(renderer.policy);
        renderer.rule(self, &clean, &owner)?;
        Ok(renderer.lines)
    }

    /// Render every `flags.make` of this directory, keyed by path relative to
    /// the build root.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::PolicyMisconfiguration`] when no policy was
    /// configured.
    pub fn render_flags(&self) -> Result<Vec<(Utf8PathBuf, Vec<String>)>, GenerateError> {
        let renderer = self.renderer()?;
        Ok(self
            .blocks
            .values()
            .filter_map(|block| {
                let flags = block.flags.as_ref()?;
                Some((
                    flags.file.clone(),
                    renderer.flags_file(self, &block.name, flags),
                ))
            })
            .collect())
    }

    /// Build-tree directories that must exist before the recipes run,
    /// relative to the build root.
    #[must_use]
    pub fn output_directories(&self) -> Vec<Utf8PathBuf> {
        let mangle = self.ctx.toolchain.mangle_object_names;
        let mut dirs: Vec<Utf8PathBuf> = Vec::new();
        for rule in self.rules() {
            let path = match &rule.output {
                Some(Location::Object {
                    dir,
                    source,
                    suffix,
                }) => dir.join(object_name(source, suffix, mangle)),
                Some(Location::Build(path)) if path.is_relative() => path.clone(),
                _ => continue,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
                if !dirs.iter().any(|d| d == parent) {
                    dirs.push(parent.to_owned());
                }
            }
        }
        dirs
    }

    fn renderer(&self) -> Result<Renderer<'_>, GenerateError> {
        let policy = self.policy()?;
        let base = if policy.shell_has_cd() {
            self.path.clone()
        } else {
            Utf8PathBuf::new()
        };
        Ok(Renderer {
            policy,
            composer: PathComposer::new(
                &base,
                self.ctx.source_root,
                self.ctx.toolchain.mangle_object_names,
                policy.path_convention(),
            ),
            makefile_name: self.ctx.makefile_name,
            lines: Vec::new(),
        })
    }

    fn write_header(&self, renderer: &mut Renderer<'_>) {
        let ctx = &self.ctx;
        let dir = if self.path.as_str().is_empty() {
            "."
        } else {
            self.path.as_str()
        };
        let up: Utf8PathBuf = (0..self.depth()).map(|_| "..").collect();
        renderer.lines.extend([
            format!("# Makefile generated by makegen for project '{}'.", ctx.project),
            "# Do not edit; changes are lost on the next generation.".to_owned(),
            format!("# Generator: {}", ctx.generator_name),
            format!("# Configuration: {}", ctx.toolchain.configuration),
            format!("# Directory: {dir}"),
            format!("# Build root: {}", renderer.composer.convert(&up)),
            String::new(),
        ]);
    }

    fn subdirectory_rules(&self) -> Vec<Rule> {
        let tree = self.ctx.graph.directories();
        tree.children(self.directory)
            .filter_map(|child| tree.get(child))
            .map(|dir| {
                let mut rule = Rule::symbolic(None, subdir_rule_name(&dir.path))
                    .with_comment(format!("Recurse into '{}'", dir.path));
                rule.commands
                    .push(CommandSpec::invocation(&dir.path, Token::literal("all")));
                rule
            })
            .collect()
    }

    fn clean_rule(&self, policy: &GeneratorPolicy) -> Rule {
        let mut files: Vec<Token> = Vec::new();
        for rule in self.rules() {
            if let Some(output) = &rule.output {
                files.push(Token::Path(output.clone()));
            }
        }
        let mut clean = Rule::symbolic(None, "clean").with_comment("Remove build outputs");
        if !files.is_empty() {
            let mut tokens = if policy.windows_shell() {
                vec![Token::raw("-del"), Token::literal("/q")]
            } else {
                vec![Token::literal("rm"), Token::literal("-f")]
            };
            tokens.extend(files);
            if policy.windows_shell() {
                tokens.push(Token::NullRedirect);
            }
            clean.commands.push(CommandSpec::tool(tokens));
        }
        let tree = self.ctx.graph.directories();
        for child in tree.children(self.directory) {
            if let Some(dir) = tree.get(child) {
                clean
                    .commands
                    .push(CommandSpec::invocation(&dir.path, Token::literal("clean")));
            }
        }
        clean
    }

    fn target_file(&self, name: &str, dependent: &str) -> Result<Location, GenerateError> {
        if self.ctx.graph.find(name).is_none() {
            return Err(GenerateError::UnresolvedDependency {
                dependent: dependent.to_owned(),
                dependency: name.to_owned(),
            });
        }
        match self.ctx.outputs.get(name) {
            Some(OutputEntry::File(path)) => Ok(Location::build(path.clone())),
            _ => Err(GenerateError::NoTargetFile {
                dependent: dependent.to_owned(),
                target: name.to_owned(),
            }),
        }
    }
}

impl Renderer<'_> {
    fn flavor(&self) -> ShellFlavor {
        ShellFlavor::from_windows_shell(self.policy.windows_shell())
    }

    fn rule(
        &mut self,
        generator: &LocalGenerator<'_>,
        rule: &Rule,
        owner: &str,
    ) -> Result<(), GenerateError> {
        if let Some(comment) = &rule.comment {
            self.lines.push(format!("# {comment}"));
        }
        let head = match &rule.output {
            Some(output) => path_word(self.composer.render(output)),
            None => rule.name.clone(),
        };
        if rule.is_symbolic() {
            match self.policy.phony_style() {
                PhonyStyle::Symbolic(marker) => self.lines.push(format!("{head} : {marker}")),
                PhonyStyle::PhonyTarget(marker) => self.lines.push(format!("{marker} : {head}")),
                PhonyStyle::Implicit => {}
            }
        }

        let mut words: Vec<String> = rule.order_only.clone();
        words.extend(
            rule.inputs
                .iter()
                .map(|input| path_word(self.composer.render(input))),
        );
        for prerequisite in &rule.prerequisites {
            words.push(match prerequisite {
                Prerequisite::File(location) => path_word(self.composer.render(location)),
                Prerequisite::TargetFile(name) => {
                    let location = generator.target_file(name, owner)?;
                    path_word(self.composer.render(&location))
                }
                Prerequisite::Rule(name) => name.clone(),
            });
        }
        let continuation = self.policy.line_continuation();
        self.lines
            .extend(wrap(&format!("{head} :"), &words, "\t", continuation));

        if rule.commands.is_empty() {
            if let Some(command) = self.policy.empty_rule_command() {
                self.lines.push(format!("\t{command}"));
            }
        }
        for command in &rule.commands {
            let words = self.command(generator, command, owner)?;
            self.lines.extend(wrap("\t", &words, "\t\t", continuation));
        }
        self.lines.push(String::new());
        Ok(())
    }

    fn command(
        &self,
        generator: &LocalGenerator<'_>,
        command: &CommandSpec,
        owner: &str,
    ) -> Result<Vec<String>, GenerateError> {
        let mut words = Vec::new();
        let working_dir = command
            .working_dir
            .as_deref()
            .map(|dir| self.composer.from_build_root(dir));
        if let Some(dir) = working_dir.as_ref().filter(|d| !d.as_str().is_empty()) {
            if self.policy.shell_has_cd() {
                let separator = self.policy.command_separator()?;
                words.push("cd".to_owned());
                words.push(path_word(self.composer.convert(dir)));
                words.push(separator.to_owned());
            } else if command.kind == CommandKind::Tool {
                debug!(owner, dir = %dir, "shell has no cd; composing paths from the build root");
            }
        }
        for token in &command.tokens {
            match token {
                Token::Literal(word) => {
                    let quoted = quote(word, self.flavor()).map_err(|_| {
                        GenerateError::InvalidArgument {
                            dependent: owner.to_owned(),
                            argument: word.clone(),
                        }
                    })?;
                    words.push(escape_make(&quoted));
                }
                Token::Raw(word) => words.push(word.clone()),
                Token::Path(location) => words.push(path_word(self.composer.render(location))),
                Token::PrefixedPath { prefix, path } => {
                    words.push(format!("{prefix}{}", path_word(self.composer.render(path))));
                }
                Token::TargetFile(name) => {
                    let location = generator.target_file(name, owner)?;
                    words.push(path_word(self.composer.render(&location)));
                }
                Token::NullRedirect => words.push(self.null_redirect()),
                Token::MakeProgram => {
                    words.push(self.policy.make_variable().to_owned());
                    if command.kind == CommandKind::Invocation {
                        words.extend(self.policy.silent_flag().map(str::to_owned));
                    }
                    if self.policy.pass_makeflags() {
                        words.push("-$(MAKEFLAGS)".to_owned());
                    }
                    if !self.policy.shell_has_cd() {
                        if let Some(dir) = &command.working_dir {
                            let makefile = self
                                .composer
                                .from_build_root(&dir.join(self.makefile_name));
                            words.push("-f".to_owned());
                            words.push(path_word(self.composer.convert(&makefile)));
                        }
                    }
                }
            }
        }
        Ok(words)
    }

    fn null_redirect(&self) -> String {
        if self.policy.define_windows_null() {
            ">$(NULL)".to_owned()
        } else {
            format!(">{}", self.policy.null_device())
        }
    }

    fn flags_file(
        &self,
        generator: &LocalGenerator<'_>,
        target: &str,
        flags: &TargetFlags,
    ) -> Vec<String> {
        let templates = &generator.ctx.toolchain.templates;
        let continuation = self.policy.line_continuation();
        let includes: Vec<String> = flags
            .set
            .include_dirs
            .iter()
            .map(|dir| {
                let location = if dir.is_absolute() {
                    Location::source(dir.clone())
                } else {
                    Location::source(flags.source_dir.join(dir))
                };
                let rendered = self.composer.render(&location);
                let word = if self.policy.quote_include_paths() {
                    double_quote(&rendered)
                } else {
                    path_word(rendered)
                };
                format!("{}{word}", templates.include_flag)
            })
            .collect();
        let defines: Vec<String> = flags
            .set
            .defines
            .iter()
            .map(|d| format!("{}{d}", templates.define_flag))
            .collect();
        let var = &flags.variable;
        let mut lines = vec![
            format!("# Flags for target '{target}'"),
            format!(
                "# Configuration: {}",
                generator.ctx.toolchain.configuration
            ),
            String::new(),
        ];
        for (suffix, words) in [
            ("FLAGS", &flags.set.compile),
            ("DEFINES", &defines),
            ("INCLUDES", &includes),
            ("LINK_FLAGS", &flags.set.link),
        ] {
            lines.extend(wrap(&format!("{var}_{suffix} ="), words, "\t", continuation));
        }
        lines
    }
}

/// Name of the rule recursing into `path`.
fn subdir_rule_name(path: &Utf8Path) -> String {
    format!("{SUBDIRECTORY_RULE_PREFIX}{}", make_identifier(path.as_str()))
}

/// Double-quote a path containing spaces.
fn path_word(path: String) -> String {
    if path.contains(' ') {
        double_quote(&path)
    } else {
        path
    }
}

/// Lay `words` out after `first`, continuing lines that would pass
/// [`LINE_WIDTH`] with `continuation`.
pub(crate) fn wrap(first: &str, words: &[String], indent: &str, continuation: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = first.to_owned();
    let mut placed = false;
    for word in words {
        let projected = current.len() + 1 + word.len() + 1 + continuation.len();
        if placed && projected > LINE_WIDTH {
            current.push(' ');
            current.push_str(continuation);
            lines.push(std::mem::replace(&mut current, format!("{indent}{word}")));
        } else {
            if !current.is_empty() && !current.ends_with('\t') {
                current.push(' ');
            }
            current.push_str(word);
        }
        placed = true;
    }
    lines.push(current);
    lines
}
