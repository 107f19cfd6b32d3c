//! Lowering targets into rules.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use super::command::{CommandSpec, Location, TemplateValues, Token, expand_template};
use super::paths::make_identifier;
use super::registry::{OutputEntry, compiled_sources, target_dir};
use super::rule::{Prerequisite, Rule};
use super::{LocalGenerator, TargetBlock, TargetFlags};
use crate::config::Language;
use crate::generator::GenerateError;
use crate::graph::{DependencyKind, GraphError, Target, TargetId, TargetKind};

/// Dependencies of one target as lowering needs them.
#[derive(Debug, Default)]
struct Dependencies {
    /// Buildable link and order-only dependencies, declaration order.
    order: Vec<String>,
    /// Libraries to link, transitively through static libraries.
    link_files: Vec<String>,
    /// Extra link words from interface requirements.
    interface_libs: Vec<String>,
}

impl LocalGenerator<'_> {
    /// Lower `id` into rules owned by this directory.
    ///
    /// A compiled target without compilable sources logs a warning and
    /// produces no rules.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::UnresolvedDependency`] when the target or
    /// one of its dependencies is unknown.
    pub fn lower(&mut self, id: TargetId) -> Result<(), GenerateError> {
        let ctx = self.ctx;
        let target = ctx
            .graph
            .target(id)
            .ok_or(GraphError::UnknownTarget { index: id.index() })?;
        if target.directory() != self.directory {
            return Err(GenerateError::UnresolvedDependency {
                dependent: self.display_name(),
                dependency: target.name().to_owned(),
            });
        }
        match ctx.outputs.get(target.name()) {
            None => {
                return Err(GenerateError::UnresolvedDependency {
                    dependent: self.display_name(),
                    dependency: target.name().to_owned(),
                });
            }
            Some(OutputEntry::Empty) => {
                warn!(
                    target = target.name(),
                    kind = %target.kind(),
                    "target has no sources; no rules generated"
                );
                return Ok(());
            }
            Some(_) => {}
        }
        let deps = self.dependencies(id, target)?;
        for name in &deps.order {
            self.add_foreign(name);
        }
        let block = if target.kind() == TargetKind::Utility {
            self.lower_utility(id, target, &deps)
        } else {
            self.lower_compiled(id, target, &deps)
        };
        debug!(
            target = target.name(),
            rules = block.rules.len(),
            "lowered target"
        );
        self.blocks.insert(target.name().to_owned(), block);
        Ok(())
    }

    fn dependencies(&self, id: TargetId, target: &Target) -> Result<Dependencies, GenerateError> {
        let graph = self.ctx.graph;
        let outputs = self.ctx.outputs;
        let mut deps = Dependencies::default();
        for edge in graph.dependencies_of(id) {
            let dep = graph
                .find(&edge.dependency)
                .and_then(|dep_id| graph.target(dep_id))
                .ok_or_else(|| GenerateError::UnresolvedDependency {
                    dependent: target.name().to_owned(),
                    dependency: edge.dependency.clone(),
                })?;
            if !outputs.is_buildable(dep.name()) {
                debug!(
                    target = target.name(),
                    dependency = dep.name(),
                    "skipping dependency without rules"
                );
                continue;
            }
            match edge.kind {
                DependencyKind::Link | DependencyKind::OrderOnly => {
                    push_unique(&mut deps.order, dep.name());
                }
                DependencyKind::Interface => {
                    for lib in &dep.interface_link {
                        push_unique(&mut deps.interface_libs, lib);
                    }
                }
            }
        }
        self.link_closure(id, &mut deps);
        Ok(deps)
    }

    /// Walk link edges depth-first, descending through static libraries
    /// whose own dependencies must appear on the final link line.
    fn link_closure(&self, id: TargetId, deps: &mut Dependencies) {
        let graph = self.ctx.graph;
        let outputs = self.ctx.outputs;
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let mut next = Vec::new();
            for edge in graph.dependencies_of(current) {
                if edge.kind != DependencyKind::Link {
                    continue;
                }
                let Some((dep_id, dep)) = graph
                    .find(&edge.dependency)
                    .and_then(|d| graph.target(d).map(|t| (d, t)))
                else {
                    continue;
                };
                if !dep.kind().is_linkable() || outputs.file(dep.name()).is_none() {
                    continue;
                }
                push_unique(&mut deps.link_files, dep.name());
                for lib in &dep.interface_link {
                    push_unique(&mut deps.interface_libs, lib);
                }
                if dep.kind() == TargetKind::StaticLibrary {
                    next.push(dep_id);
                }
            }
            stack.extend(next.into_iter().rev());
        }
    }

    fn add_foreign(&mut self, name: &str) {
        let graph = self.ctx.graph;
        let Some(dep) = graph.find(name).and_then(|id| graph.target(id)) else {
            return;
        };
        if dep.directory() == self.directory || self.foreign.contains_key(name) {
            return;
        }
        let Some(dir) = graph.directories().get(dep.directory()) else {
            return;
        };
        let dir_label = if dir.path.as_str().is_empty() {
            "."
        } else {
            dir.path.as_str()
        };
        let mut rule = Rule::symbolic(None, name)
            .with_comment(format!("Build '{name}' from directory '{dir_label}'"));
        rule.commands
            .push(CommandSpec::invocation(&dir.path, Token::literal(name)));
        self.foreign.insert(name.to_owned(), rule);
    }

    fn lower_compiled(&self, id: TargetId, target: &Target, deps: &Dependencies) -> TargetBlock {
        let toolchain = self.ctx.toolchain;
        let templates = &toolchain.templates;
        let name = target.name();
        let tdir = target_dir(&self.path, name);
        let flags_file = tdir.join("flags.make");
        let var = make_identifier(name);
        let sources = compiled_sources(target, toolchain, true);

        let mut object_rules = Vec::with_capacity(sources.len());
        let mut objects = Vec::with_capacity(sources.len());
        for (source, language) in &sources {
            let object = Location::Object {
                dir: tdir.clone(),
                source: (*source).to_owned(),
                suffix: toolchain.naming.object_suffix.to_owned(),
            };
            let source_location = Location::source(self.path.join(source));
            let values = TemplateValues {
                compiler: toolchain.compiler(*language),
                flags: Some(format!("$({var}_FLAGS)")),
                defines: Some(format!("$({var}_DEFINES)")),
                includes: Some(format!("$({var}_INCLUDES)")),
                object: Some(object.clone()),
                source: Some(source_location.clone()),
                ..TemplateValues::default()
            };
            let mut rule = Rule::file(Some(id), object.clone());
            rule.inputs.push(source_location);
            rule.prerequisites
                .push(Prerequisite::File(Location::build(flags_file.clone())));
            rule.commands
                .push(CommandSpec::tool(expand_template(templates.compile, &values)));
            object_rules.push(rule);
            objects.push(object);
        }

        let output = Location::build(
            self.ctx
                .outputs
                .file(name)
                .map_or_else(|| self.path.join(name), Utf8Path::to_owned),
        );
        let links_others = matches!(
            target.kind(),
            TargetKind::Executable | TargetKind::SharedLibrary
        );
        let mut link_libraries: Vec<Token> = Vec::new();
        if links_others {
            link_libraries.extend(deps.link_files.iter().cloned().map(Token::TargetFile));
            link_libraries.extend(deps.interface_libs.iter().map(Token::literal));
        }
        let template = match target.kind() {
            TargetKind::StaticLibrary => templates.static_archive,
            TargetKind::SharedLibrary => templates.shared_link,
            _ => templates.executable_link,
        };
        let values = TemplateValues {
            compiler: link_language(&sources).and_then(|l| toolchain.compiler(l)),
            link_flags: Some(format!("$({var}_LINK_FLAGS)")),
            target: Some(output.clone()),
            objects: objects.clone(),
            link_libraries,
            ..TemplateValues::default()
        };
        let mut link = Rule::file(Some(id), output.clone())
            .with_comment(format!("Link {} {name}", target.kind()));
        link.inputs = objects;
        if links_others {
            link.prerequisites.extend(
                deps.link_files
                    .iter()
                    .cloned()
                    .map(Prerequisite::TargetFile),
            );
        }
        link.commands
            .push(CommandSpec::tool(expand_template(template, &values)));

        let mut symbolic = Rule::symbolic(Some(id), name);
        symbolic.order_only.clone_from(&deps.order);
        symbolic
            .commands
            .push(CommandSpec::invocation(&self.path, Token::Path(output)));

        let mut set = toolchain.default_flags();
        set.extend_from(&target.effective_flags(toolchain.configuration.name()));

        let mut rules = vec![symbolic, link];
        rules.extend(object_rules);
        TargetBlock {
            id,
            name: name.to_owned(),
            flags: Some(TargetFlags {
                file: flags_file,
                variable: var,
                source_dir: self.path.clone(),
                set,
            }),
            rules,
            primary: 1,
        }
    }

    fn lower_utility(&self, id: TargetId, target: &Target, deps: &Dependencies) -> TargetBlock {
        let name = target.name();
        let commands: Vec<CommandSpec> = target
            .commands
            .iter()
            .filter(|argv| !argv.is_empty())
            .map(|argv| CommandSpec::from_argv(argv.as_slice(), &self.path))
            .collect();
        let inputs: Vec<Location> = target
            .sources
            .iter()
            .map(|s| Location::source(self.path.join(s)))
            .collect();

        let mut symbolic = Rule::symbolic(Some(id), name);
        symbolic.order_only.clone_from(&deps.order);

        let outputs: Vec<Utf8PathBuf> = target.outputs.iter().map(|o| self.path.join(o)).collect();
        let Some((first, rest)) = outputs.split_first() else {
            symbolic.inputs = inputs;
            symbolic.commands = commands;
            return TargetBlock {
                id,
                name: name.to_owned(),
                flags: None,
                rules: vec![symbolic],
                primary: 0,
            };
        };

        let first = Location::build(first.clone());
        symbolic
            .commands
            .push(CommandSpec::invocation(&self.path, Token::Path(first.clone())));
        let mut produce = Rule::file(Some(id), first.clone())
            .with_comment(format!("Custom command for {name}"));
        produce.inputs = inputs;
        produce.commands = commands;
        let mut rules = vec![symbolic, produce];
        for extra in rest {
            let mut rule = Rule::file(Some(id), Location::build(extra.clone()));
            rule.prerequisites.push(Prerequisite::File(first.clone()));
            rules.push(rule);
        }
        TargetBlock {
            id,
            name: name.to_owned(),
            flags: None,
            rules,
            primary: 1,
        }
    }
}

/// Language whose compiler drives the link: C++ wins over everything else,
/// otherwise the first compiled language.
fn link_language(sources: &[(&Utf8Path, Language)]) -> Option<Language> {
    if sources.iter().any(|(_, l)| *l == Language::Cxx) {
        return Some(Language::Cxx);
    }
    sources.first().map(|(_, l)| *l)
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_owned());
    }
}
