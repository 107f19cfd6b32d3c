//! End-to-end validation of makefile generation.
//!
//! These tests drive the library from manifest text to a written build tree
//! and check the result the way the native tool would see it: a snapshot of
//! a small WMake makefile, a simulated recursive make run that must never
//! consume an output before it is built, and the policy conventions every
//! WMake line has to follow.

use anyhow::{Context, Result, bail, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use insta::{Settings, assert_snapshot};
use makegen::backend::{Backend, NMAKE, UNIX_MAKEFILES, WATCOM_WMAKE};
use makegen::config::Definitions;
use makegen::generator::{GenerateError, GeneratedTree, GlobalGenerator};
use makegen::graph::GraphError;
use makegen::manifest;
use makegen::project::{Project, ProjectError};
use rstest::rstest;
use std::collections::{HashMap, HashSet};
use std::fs;
use tempfile::tempdir;

const LAYERED: &str = r#"
makegen_version: "1.0.0"
project: layered
languages: [C]
targets:
  - name: util
    kind: static-library
    directory: lib
    sources: util.c
  - name: core
    kind: static-library
    directory: lib/core
    sources: [core.c, extra.c]
    link: util
  - name: app
    kind: executable
    sources: main.c
    link: core
    post_build: ["echo linked"]
"#;

fn project(yaml: &str) -> Result<Project> {
    let manifest = manifest::from_str(yaml).context("parse manifest")?;
    Ok(Project::from_manifest(&manifest, "..")?)
}

fn generate(backend: &'static Backend, project: &Project) -> Result<(GlobalGenerator, GeneratedTree)> {
    let mut generator = GlobalGenerator::new(backend)?;
    let mut store = Definitions::default();
    generator.enable_language(&["C"], &mut store)?;
    let tree = generator.generate(project)?;
    Ok((generator, tree))
}

fn file<'t>(tree: &'t GeneratedTree, path: &str) -> Result<&'t str> {
    tree.get(path)
        .with_context(|| format!("generated tree should contain {path}"))
}

/// Lines between `# Target: name` and the next block or directory rule.
fn target_block<'a>(makefile: &'a str, name: &str) -> Vec<&'a str> {
    let header = format!("# Target: {name}");
    makefile
        .lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| !line.starts_with("# Target: ") && *line != "# Remove build outputs")
        .collect()
}

#[test]
fn watcom_single_executable_snapshot() -> Result<()> {
    let hello = project(
        r#"
makegen_version: "1.0.0"
project: hello
targets:
  - name: hello
    kind: executable
    sources: main.c
"#,
    )?;
    let (_, tree) = generate(&WATCOM_WMAKE, &hello)?;
    let makefile = file(&tree, "Makefile")?;

    let mut settings = Settings::new();
    settings.set_snapshot_path(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/snapshots/generation"
    ));
    settings.bind(|| {
        assert_snapshot!("watcom_single_executable", makefile);
    });

    let flags = file(&tree, "hello.dir/flags.make")?;
    ensure!(flags.contains("hello_FLAGS = -d2"), "debug flags missing:\n{flags}");
    ensure!(flags.contains("hello_LINK_FLAGS = -d2"), "debug link flags missing:\n{flags}");
    Ok(())
}

#[test]
fn watcom_library_and_executable_blocks() -> Result<()> {
    let yaml = fs::read_to_string("tests/data/Makegenfile").context("read manifest")?;
    let demo = project(&yaml)?;
    let (_, tree) = generate(&WATCOM_WMAKE, &demo)?;
    let makefile = file(&tree, "Makefile")?;

    let lib = target_block(makefile, "lib");
    let app = target_block(makefile, "app");
    ensure!(!lib.is_empty() && !app.is_empty(), "both blocks expected:\n{makefile}");
    ensure!(
        lib.iter().all(|line| !line.contains("app")),
        "the library block must not mention the executable:\n{}",
        lib.join("\n")
    );
    ensure!(
        app.iter().any(|line| line.starts_with("app.exe :") && line.contains("lib.lib")),
        "the executable must depend on the library file:\n{}",
        app.join("\n")
    );
    ensure!(
        app.iter().any(|line| line.starts_with("app : lib")),
        "the executable rule must wait for the library rule:\n{}",
        app.join("\n")
    );
    ensure!(makefile.contains("app : .SYMBOLIC"), "symbolic marker missing");
    ensure!(
        makefile.find("# Target: lib") < makefile.find("# Target: app"),
        "targets must follow dependency order"
    );
    Ok(())
}

/// A makefile reduced to what matters for scheduling.
#[derive(Debug, Default)]
struct ParsedMakefile {
    rules: HashMap<String, ParsedRule>,
}

#[derive(Debug, Default)]
struct ParsedRule {
    prerequisites: Vec<String>,
    commands: Vec<String>,
}

/// Join `&` continuations and collect rules; recognises the WMake dialect
/// emitted by the generator only.
fn parse_wmake(text: &str) -> ParsedMakefile {
    let mut logical: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;
    for line in text.lines() {
        let piece = match pending.take() {
            Some(mut head) => {
                head.push(' ');
                head.push_str(line.trim());
                head
            }
            None => line.to_owned(),
        };
        if let Some(stripped) = piece.strip_suffix(" &") {
            pending = Some(stripped.to_owned());
        } else {
            logical.push(piece);
        }
    }

    let mut parsed = ParsedMakefile::default();
    let mut current: Option<String> = None;
    for line in logical {
        if let Some(command) = line.strip_prefix('\t') {
            if let Some(rule) = current.as_ref().and_then(|n| parsed.rules.get_mut(n)) {
                rule.commands.push(command.trim().to_owned());
            }
            continue;
        }
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') || line.contains(" = ")
        {
            continue;
        }
        let Some((head, rest)) = line.split_once(" :") else {
            continue;
        };
        let rule = parsed.rules.entry(head.to_owned()).or_default();
        rule.prerequisites.extend(
            rest.split_whitespace()
                .filter(|word| *word != ".SYMBOLIC")
                .map(str::to_owned),
        );
        current = Some(head.to_owned());
    }
    parsed
}

/// Walks the makefiles the way a serial recursive make would.
struct Simulator<'a> {
    makefiles: HashMap<String, ParsedMakefile>,
    visited: HashSet<(String, String)>,
    built: HashSet<String>,
    order: Vec<String>,
    violations: Vec<String>,
    tree: &'a GeneratedTree,
}

impl<'a> Simulator<'a> {
    fn new(tree: &'a GeneratedTree) -> Self {
        let makefiles = tree
            .files()
            .filter(|(path, _)| path.file_name() == Some("Makefile"))
            .map(|(path, text)| (path.as_str().to_owned(), parse_wmake(text)))
            .collect();
        Self {
            makefiles,
            visited: HashSet::new(),
            built: HashSet::new(),
            order: Vec::new(),
            violations: Vec::new(),
            tree,
        }
    }

    fn is_static_input(&self, word: &str) -> bool {
        word.starts_with("..\\") || self.tree.get(word.replace('\\', "/")).is_some()
    }

    fn make(&mut self, makefile: &str, goal: &str) -> Result<()> {
        if !self.visited.insert((makefile.to_owned(), goal.to_owned())) {
            return Ok(());
        }
        let (prerequisites, commands) = {
            let parsed = self
                .makefiles
                .get(makefile)
                .with_context(|| format!("no makefile {makefile}"))?;
            match parsed.rules.get(goal) {
                Some(rule) => (rule.prerequisites.clone(), rule.commands.clone()),
                None if self.built.contains(goal) || self.is_static_input(goal) => return Ok(()),
                None => bail!("{makefile} has no rule for {goal}"),
            }
        };
        for prerequisite in &prerequisites {
            let has_rule = self
                .makefiles
                .get(makefile)
                .is_some_and(|m| m.rules.contains_key(prerequisite));
            if has_rule {
                self.make(makefile, prerequisite)?;
            } else if !self.built.contains(prerequisite) && !self.is_static_input(prerequisite) {
                self.violations
                    .push(format!("{goal} in {makefile} consumed {prerequisite} before it was built"));
            }
        }
        for command in &commands {
            let words: Vec<&str> = command.split_whitespace().collect();
            if words.first() != Some(&"$(MAKE)") {
                continue;
            }
            let sub = words
                .iter()
                .position(|w| *w == "-f")
                .and_then(|i| words.get(i + 1))
                .context("recursive invocation without -f")?
                .replace('\\', "/");
            let sub_goal = words.last().context("recursive invocation without goal")?;
            self.make(&sub, sub_goal)?;
        }
        self.built.insert(goal.to_owned());
        self.order.push(goal.to_owned());
        Ok(())
    }
}

#[test]
fn recursive_build_never_consumes_unbuilt_outputs() -> Result<()> {
    let layered = project(LAYERED)?;
    let (_, tree) = generate(&WATCOM_WMAKE, &layered)?;
    let mut sim = Simulator::new(&tree);
    sim.make("Makefile", "all")?;
    ensure!(sim.violations.is_empty(), "{:#?}", sim.violations);

    let position = |goal: &str| sim.order.iter().position(|g| g == goal);
    let util = position("lib\\util.lib").context("util built")?;
    let core = position("lib\\core\\core.lib").context("core built")?;
    let app = position("app.exe").context("app built")?;
    ensure!(util < core && core < app, "build order {:?}", sim.order);
    Ok(())
}

#[test]
fn executable_links_the_static_closure() -> Result<()> {
    let layered = project(LAYERED)?;
    let (_, tree) = generate(&WATCOM_WMAKE, &layered)?;
    let makefile = file(&tree, "Makefile")?;
    let parsed = parse_wmake(makefile);
    let link = parsed.rules.get("app.exe").context("link rule")?;
    ensure!(
        link.prerequisites.contains(&"lib\\core\\core.lib".to_owned())
            && link.prerequisites.contains(&"lib\\util.lib".to_owned()),
        "static dependencies must reach the link line: {:?}",
        link.prerequisites
    );
    ensure!(
        link.commands.last().map(String::as_str) == Some("echo linked"),
        "post-build step must follow the link: {:?}",
        link.commands
    );
    Ok(())
}

#[test]
fn watcom_lines_follow_the_policy() -> Result<()> {
    let layered = project(LAYERED)?;
    let (_, tree) = generate(&WATCOM_WMAKE, &layered)?;
    for (path, text) in tree.files() {
        let lines: Vec<&str> = text.lines().collect();
        for pair in lines.windows(2) {
            let [line, next] = pair else { continue };
            if next.starts_with("\t\t") {
                ensure!(line.ends_with(" &"), "{path}: '{line}' continues without '&'");
            }
        }
        for line in &lines {
            ensure!(!line.ends_with('\\'), "{path}: backslash continuation in '{line}'");
            ensure!(!line.starts_with("\tcd "), "{path}: recipe changes directory: '{line}'");
            if line.contains("$(MAKE)") {
                ensure!(line.contains("$(MAKE) -h "), "{path}: silent flag missing in '{line}'");
            }
        }
        if path.file_name() == Some("Makefile") {
            ensure!(text.contains("all : .SYMBOLIC"), "{path}: default goal not symbolic");
            ensure!(text.contains("NULL = nul"), "{path}: NULL definition missing");
        }
    }
    Ok(())
}

#[rstest]
#[case(&UNIX_MAKEFILES, ".PHONY : all", "\\")]
#[case(&NMAKE, "all :", "\\")]
#[case(&WATCOM_WMAKE, "all : .SYMBOLIC", "&")]
fn every_backend_renders_its_own_dialect(
    #[case] backend: &'static Backend,
    #[case] default_goal: &str,
    #[case] continuation: &str,
) -> Result<()> {
    let layered = project(LAYERED)?;
    let (_, tree) = generate(backend, &layered)?;
    let makefile = file(&tree, "Makefile")?;
    ensure!(makefile.contains(default_goal), "{}:\n{makefile}", backend.name);
    let continued = tree
        .files()
        .flat_map(|(_, text)| text.lines())
        .filter(|line| line.ends_with(&format!(" {continuation}")))
        .count();
    ensure!(continued > 0, "{} never continues a line", backend.name);
    Ok(())
}

#[test]
fn generation_is_deterministic() -> Result<()> {
    let layered = project(LAYERED)?;
    let (_, first) = generate(&WATCOM_WMAKE, &layered)?;
    let (_, second) = generate(&WATCOM_WMAKE, &project(LAYERED)?)?;
    ensure!(first == second, "trees differ between runs");
    ensure!(first.fingerprint() == second.fingerprint(), "fingerprints differ");
    Ok(())
}

#[test]
fn second_write_touches_nothing() -> Result<()> {
    let layered = project(LAYERED)?;
    let dir = tempdir().context("tempdir")?;
    let build = Utf8Path::from_path(dir.path()).context("utf8 tempdir")?;

    let (mut generator, tree) = generate(&WATCOM_WMAKE, &layered)?;
    let first = generator.write(&tree, build)?;
    ensure!(first.written.len() == tree.len(), "first write: {first:?}");
    ensure!(build.join("lib/core/Makefile").is_file(), "nested makefile missing");

    let (mut again, same) = generate(&WATCOM_WMAKE, &layered)?;
    let second = again.write(&same, build)?;
    ensure!(second.up_to_date, "second write: {second:?}");
    ensure!(second.written.is_empty(), "second write: {second:?}");
    Ok(())
}

#[test]
fn cycles_are_rejected_before_anything_is_written() -> Result<()> {
    let cyclic = project(
        r#"
makegen_version: "1.0.0"
project: cyclic
targets:
  - name: a
    kind: utility
    commands: ["echo a"]
    order_only: b
  - name: b
    kind: utility
    commands: ["echo b"]
    order_only: a
"#,
    )?;
    let mut generator = GlobalGenerator::new(&WATCOM_WMAKE)?;
    let mut store = Definitions::default();
    generator.enable_language(&["C"], &mut store)?;
    let Err(err) = generator.generate(&cyclic) else {
        bail!("a dependency cycle must fail generation");
    };
    let GenerateError::Graph(GraphError::CyclicDependency { cycle }) = &err else {
        bail!("unexpected error: {err}");
    };
    ensure!(cycle.first() == cycle.last(), "cycle should be closed: {cycle:?}");

    let dir = tempdir().context("tempdir")?;
    let build = Utf8PathBuf::from_path_buf(dir.path().join("build"))
        .map_err(|p| anyhow::anyhow!("non-UTF-8 path {}", p.display()))?;
    ensure!(
        generator.write(&GeneratedTree::default(), &build).is_err(),
        "writing must be refused after a failed generation"
    );
    ensure!(!build.exists(), "nothing may be written");
    Ok(())
}

#[test]
fn link_cycles_are_rejected_while_resolving_the_project() -> Result<()> {
    let manifest = manifest::from_str(
        r#"
makegen_version: "1.0.0"
project: cyclic
targets:
  - { name: a, kind: static-library, sources: a.c, link: b }
  - { name: b, kind: static-library, sources: b.c, link: a }
"#,
    )
    .context("parse manifest")?;
    let Err(err) = Project::from_manifest(&manifest, "..") else {
        bail!("a link cycle must be rejected");
    };
    ensure!(
        matches!(
            err,
            ProjectError::Graph(GraphError::CyclicDependency { ref cycle }) if cycle.len() == 3
        ),
        "unexpected error: {err}"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn make_passes_dollar_words_through_to_the_shell() -> Result<()> {
    // Hosts without GNU make have nothing to run the makefile with.
    if std::process::Command::new("make").arg("--version").output().is_err() {
        return Ok(());
    }
    let show = project(
        r#"
makegen_version: "1.0.0"
project: show
targets:
  - name: show
    kind: utility
    commands: [["echo", "$HOME"], "echo 'cost: $5'"]
"#,
    )?;
    let (mut generator, tree) = generate(&UNIX_MAKEFILES, &show)?;
    let dir = tempdir().context("tempdir")?;
    let build = Utf8Path::from_path(dir.path()).context("utf8 tempdir")?;
    generator.write(&tree, build)?;

    let output = std::process::Command::new("make")
        .args(["-s", "show"])
        .current_dir(build)
        .env("HOME", "/home/makegen")
        .env_remove("MAKEFLAGS")
        .env_remove("MFLAGS")
        .output()
        .context("run make")?;
    ensure!(
        output.status.success(),
        "make failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    ensure!(stdout == "$HOME\ncost: $5\n", "user text was expanded: {stdout:?}");
    Ok(())
}
