//! Resolved project description.
//!
//! [`Project::from_manifest`] turns a parsed [`Makegenfile`] into the
//! directory tree and target graph the generators consume.

// The unused_assignments lint fires in some Rust versions on fields consumed
// only by the thiserror/miette derives.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ast::{CommandLine, Makegenfile, TargetDecl};
use crate::config::Definitions;
use crate::graph::{DependencyKind, DirectoryId, GraphError, TargetGraph};

/// Errors raised while resolving a manifest into a project.
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    /// The target graph rejected a declaration.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// A directory escapes the project root.
    #[error("directory '{path}' must be relative and stay inside the project")]
    #[diagnostic(code(makegen::project::directory))]
    InvalidDirectory {
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// A command line has unbalanced quoting.
    #[error("target '{target}' has a command with unbalanced quoting: {command}")]
    #[diagnostic(
        code(makegen::project::command),
        help("close the quote or write the command as a list of words")
    )]
    InvalidCommand {
        /// Target holding the command.
        target: String,
        /// The command as written.
        command: String,
    },
}

/// A project ready for generation.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    /// Project name.
    pub name: String,
    /// Source root as spelled from the build root.
    pub source_root: Utf8PathBuf,
    /// Languages to enable.
    pub languages: Vec<String>,
    /// Configuration used when none is requested.
    pub build_type: Option<String>,
    /// Seed values for the definition store.
    pub definitions: Definitions,
    /// Targets and their dependencies.
    pub graph: TargetGraph,
    /// Extra commands per target, run after its main step.
    pub post_build: IndexMap<String, Vec<Vec<String>>>,
}

impl Project {
    /// Resolve `manifest`, whose sources live at `source_root` as seen from
    /// the build root.
    ///
    /// Directories listed in the manifest come first, in order; directories
    /// named only by targets follow in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] for duplicate targets, link cycles, escaping
    /// directories and unsplittable command lines.
    pub fn from_manifest(
        manifest: &Makegenfile,
        source_root: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ProjectError> {
        let mut graph = TargetGraph::default();
        for dir in &manifest.directories {
            graph.add_directory(checked_directory(dir)?);
        }

        let mut post_build = IndexMap::new();
        let mut declared = Vec::with_capacity(manifest.targets.len());
        for decl in &manifest.targets {
            let directory = match &decl.directory {
                Some(dir) => graph.add_directory(checked_directory(dir)?),
                None => DirectoryId::ROOT,
            };
            let id = graph.add_target(decl.name.clone(), decl.kind, directory)?;
            if let Some(target) = graph.target_mut(id) {
                target.sources = decl.sources.iter().map(Utf8PathBuf::from).collect();
                target.flags = decl.flags.clone();
                target.config_flags = decl.config.clone();
                target.commands = argv_list(decl, &decl.commands)?;
                target.outputs = decl.outputs.iter().map(Utf8PathBuf::from).collect();
                target.interface_link = decl.interface_link.to_vec();
            }
            let steps = argv_list(decl, &decl.post_build)?;
            if !steps.is_empty() {
                post_build.insert(decl.name.clone(), steps);
            }
            declared.push((id, decl));
        }

        // Edges are added once every target exists so link cycles are caught
        // regardless of declaration order.
        for (id, decl) in declared {
            for (names, kind) in [
                (&decl.link, DependencyKind::Link),
                (&decl.order_only, DependencyKind::OrderOnly),
                (&decl.interface, DependencyKind::Interface),
            ] {
                for name in names.iter() {
                    graph.add_dependency(id, name, kind)?;
                }
            }
        }
        debug!(
            project = %manifest.project,
            directories = graph.directories().len(),
            targets = graph.len(),
            "resolved project"
        );

        Ok(Self {
            name: manifest.project.clone(),
            source_root: source_root.into(),
            languages: manifest.languages.to_vec(),
            build_type: manifest.build_type.clone(),
            definitions: manifest
                .definitions
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            graph,
            post_build,
        })
    }

    /// Extra commands registered for `target`.
    pub fn post_build_steps(&self, target: &str) -> impl Iterator<Item = &[String]> {
        self.post_build
            .get(target)
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
    }
}

fn checked_directory(path: &Utf8Path) -> Result<&Utf8Path, ProjectError> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ProjectError::InvalidDirectory {
            path: path.to_owned(),
        });
    }
    Ok(path)
}

fn argv_list(decl: &TargetDecl, lines: &[CommandLine]) -> Result<Vec<Vec<String>>, ProjectError> {
    lines
        .iter()
        .map(|line| {
            line.to_argv()
                .ok_or_else(|| ProjectError::InvalidCommand {
                    target: decl.name.clone(),
                    command: match line {
                        CommandLine::Line(text) => text.clone(),
                        CommandLine::Argv(words) => words.join(" "),
                    },
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TargetKind;
    use crate::manifest;
    use rstest::rstest;

    fn project(yaml: &str) -> Result<Project, ProjectError> {
        let manifest = manifest::from_str(yaml).expect("manifest");
        Project::from_manifest(&manifest, "..")
    }

    #[rstest]
    fn builds_directories_targets_and_edges() {
        let project = project(
            r#"
makegen_version: "1.0.0"
project: demo
languages: C
directories: [lib]
targets:
  - name: app
    kind: executable
    sources: main.c
    link: util
    post_build: ["echo done"]
  - name: util
    kind: static-library
    directory: lib/core
    sources: util.c
"#,
        )
        .expect("project");
        let dirs: Vec<&str> = project
            .graph
            .directories()
            .iter()
            .map(|(_, d)| d.path.as_str())
            .collect();
        assert_eq!(dirs, ["", "lib", "lib/core"]);
        let order: Vec<&str> = project
            .graph
            .topological_order()
            .expect("order")
            .map(|t| t.name())
            .collect();
        assert_eq!(order, ["util", "app"]);
        let util = project.graph.find("util").and_then(|id| project.graph.target(id));
        assert_eq!(util.map(|t| t.kind()), Some(TargetKind::StaticLibrary));
        let steps: Vec<&[String]> = project.post_build_steps("app").collect();
        assert_eq!(steps, [["echo".to_owned(), "done".to_owned()].as_slice()]);
        assert_eq!(project.post_build_steps("util").count(), 0);
    }

    #[rstest]
    #[case("../outside")]
    #[case("/abs")]
    fn escaping_directories_are_rejected(#[case] dir: &str) {
        let yaml = format!(
            "makegen_version: \"1.0.0\"\nproject: p\ndirectories: [\"{dir}\"]\n"
        );
        let err = project(&yaml).expect_err("escaping directory");
        assert!(matches!(err, ProjectError::InvalidDirectory { .. }));
    }

    #[rstest]
    fn link_cycles_are_rejected_whatever_the_order() {
        let err = project(
            r#"
makegen_version: "1.0.0"
project: p
targets:
  - { name: a, kind: static-library, sources: a.c, link: b }
  - { name: b, kind: static-library, sources: b.c, link: a }
"#,
        )
        .expect_err("cycle");
        assert!(matches!(
            err,
            ProjectError::Graph(GraphError::CyclicDependency { .. })
        ));
    }

    #[rstest]
    #[case("clean")]
    #[case("all")]
    fn directory_rule_names_cannot_be_targets(#[case] name: &str) {
        let yaml = format!(
            "makegen_version: \"1.0.0\"\nproject: p\ntargets:\n  - {{ name: {name}, kind: executable, sources: main.c }}\n"
        );
        let err = project(&yaml).expect_err("reserved name");
        assert!(matches!(
            err,
            ProjectError::Graph(GraphError::ReservedTargetName { name: ref rejected }) if rejected == name
        ));
    }

    #[rstest]
    fn unbalanced_commands_are_rejected() {
        let err = project(
            "makegen_version: \"1.0.0\"\nproject: p\ntargets:\n  - name: gen\n    kind: utility\n    commands: [\"echo 'open\"]\n",
        )
        .expect_err("quoting");
        assert!(matches!(err, ProjectError::InvalidCommand { ref target, .. } if target == "gen"));
    }

    #[rstest]
    fn project_serialises_for_debug_dumps() {
        let project = project("makegen_version: \"1.0.0\"\nproject: p\n").expect("project");
        let json = serde_json::to_value(&project).expect("json");
        assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("p"));
    }
}
