//! Tests for lowering and rendering directory makefiles.

use super::*;
use crate::backend::{Backend, UNIX_MAKEFILES, WATCOM_WMAKE};
use crate::config::{Configuration, Language};
use crate::graph::{DependencyKind, TargetKind};
use rstest::rstest;

struct Fixture {
    backend: &'static Backend,
    graph: TargetGraph,
    toolchain: ToolchainConfig,
    policy: GeneratorPolicy,
    outputs: OutputRegistry,
    order: Vec<TargetId>,
    source_root: Utf8PathBuf,
}

impl Fixture {
    fn new(backend: &'static Backend, graph: TargetGraph) -> Self {
        let policy = backend.policy().expect("policy");
        let compilers = [Language::C, Language::Cxx]
            .into_iter()
            .filter_map(|l| backend.toolchain.compiler(l).map(|c| (l, c.to_owned())))
            .collect();
        let toolchain =
            backend
                .toolchain
                .instantiate(compilers, Configuration::new("Debug"), &policy);
        let order = graph
            .topological_order()
            .expect("acyclic")
            .filter_map(|t| graph.find(t.name()))
            .collect();
        let mut outputs = OutputRegistry::default();
        for (dir, _) in graph.directories().iter() {
            outputs.register_directory(&graph, dir, &toolchain, &policy);
        }
        Self {
            backend,
            graph,
            toolchain,
            policy,
            outputs,
            order,
            source_root: Utf8PathBuf::from("../src"),
        }
    }

    fn context(&self) -> GeneratorContext<'_> {
        GeneratorContext {
            graph: &self.graph,
            toolchain: &self.toolchain,
            outputs: &self.outputs,
            order: &self.order,
            source_root: &self.source_root,
            makefile_name: self.backend.makefile_name,
            generator_name: self.backend.name,
            project: "demo",
        }
    }

    fn lowered(&self, dir: &str) -> LocalGenerator<'_> {
        let id = self
            .graph
            .directories()
            .find(Utf8Path::new(dir))
            .expect("directory");
        let mut local = LocalGenerator::new(self.context(), id).expect("generator");
        local.configure(&self.policy);
        local.lower_all().expect("lower");
        local
    }

    fn render(&self, dir: &str) -> String {
        self.lowered(dir).render().expect("render").join("\n")
    }
}

/// `app` in the root links `util` from `sub`.
fn app_and_library() -> TargetGraph {
    let mut graph = TargetGraph::default();
    let sub = graph.add_directory("sub");
    let util = graph
        .add_target("util", TargetKind::StaticLibrary, sub)
        .expect("util");
    if let Some(target) = graph.target_mut(util) {
        target.sources.push("util.c".into());
    }
    let app = graph
        .add_target("app", TargetKind::Executable, DirectoryId::ROOT)
        .expect("app");
    if let Some(target) = graph.target_mut(app) {
        target.sources.extend(["main.c".into(), "src/extra.c".into()]);
        target.flags.defines.push("APP=1".into());
        target.flags.include_dirs.push("include dir".into());
    }
    graph
        .add_dependency(app, "util", DependencyKind::Link)
        .expect("edge");
    graph
}

#[rstest]
fn watcom_marks_rules_symbolic_and_defines_null() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let text = fixture.render("");
    assert!(text.contains("NULL = nul\n"));
    assert!(text.contains("all : .SYMBOLIC\nall : app subdir.sub\n"));
    assert!(text.contains("app : .SYMBOLIC\napp : util\n"));
    assert!(text.contains("clean : .SYMBOLIC\n"));
    assert!(!text.contains(".PHONY"));
}

#[rstest]
fn watcom_injects_silent_flag_and_uses_makefile_paths() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let text = fixture.render("");
    assert!(text.contains("\t$(MAKE) -h -f sub\\Makefile util\n"));
    assert!(text.contains("\t$(MAKE) -h -f Makefile app.exe\n"));
    assert!(text.contains("\t$(MAKE) -h -f sub\\Makefile all\n"));
    assert!(!text.contains("cd sub"));
}

#[rstest]
fn watcom_mangles_objects_and_links_library_files() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let text = fixture.render("");
    assert!(text.contains("app.dir\\main_c.obj : ..\\src\\main.c app.dir\\flags.make\n"));
    assert!(text.contains("app.dir\\src_extra_c.obj : ..\\src\\src\\extra.c"));
    assert!(text.contains("-fo=app.dir\\main_c.obj -c ..\\src\\main.c"));
    assert!(text.contains("app.exe : app.dir\\main_c.obj app.dir\\src_extra_c.obj sub\\util.lib"));
    assert!(text.contains("!include app.dir\\flags.make\n"));
}

#[rstest]
fn watcom_library_name_ignores_prefix() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    assert_eq!(
        fixture.outputs.file("util"),
        Some(Utf8Path::new("sub/util.lib"))
    );
    let text = fixture.render("sub");
    assert!(text.contains("wlib -q -b -c -n sub\\util.lib +sub\\util.dir\\util_c.obj"));
}

#[rstest]
fn watcom_flags_quote_include_paths() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let local = fixture.lowered("");
    let flags = local.render_flags().expect("flags");
    let (path, lines) = flags.first().expect("one flags file");
    assert_eq!(path, Utf8Path::new("app.dir/flags.make"));
    let text = lines.join("\n");
    assert!(text.contains("app_DEFINES = -dAPP=1"));
    assert!(text.contains("app_INCLUDES = -i=\"..\\src\\include dir\""));
    assert!(text.contains("app_FLAGS = "));
}

#[rstest]
fn unix_composes_cd_for_recursion() {
    let fixture = Fixture::new(&UNIX_MAKEFILES, app_and_library());
    let text = fixture.render("");
    assert!(text.contains(".PHONY : all\n"));
    assert!(text.contains("\tcd sub && $(MAKE) -s util\n"));
    assert!(text.contains("\t$(MAKE) -s bin/app\n"));
    assert!(text.contains("bin/app : app.dir/main.o app.dir/src/extra.o sub/libutil.a\n"));
    assert!(text.contains("\trm -f "));
    assert!(!text.contains("NULL = nul"));
}

#[rstest]
fn unix_paths_are_relative_to_the_makefile_directory() {
    let fixture = Fixture::new(&UNIX_MAKEFILES, app_and_library());
    let text = fixture.render("sub");
    assert!(text.contains("libutil.a : util.dir/util.o\n"));
    assert!(text.contains("util.dir/util.o : ../../src/sub/util.c util.dir/flags.make\n"));
    assert!(text.contains("ar rcs libutil.a util.dir/util.o"));
}

#[rstest]
fn unix_lists_output_directories() {
    let fixture = Fixture::new(&UNIX_MAKEFILES, app_and_library());
    let local = fixture.lowered("");
    assert_eq!(
        local.output_directories(),
        vec![
            Utf8PathBuf::from("bin"),
            Utf8PathBuf::from("app.dir"),
            Utf8PathBuf::from("app.dir/src")
        ]
    );
}

#[rstest]
fn header_names_project_and_generator() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let lines = fixture.lowered("sub").render().expect("render");
    assert_eq!(
        lines.get(..6).expect("header"),
        [
            "# Makefile generated by makegen for project 'demo'.",
            "# Do not edit; changes are lost on the next generation.",
            "# Generator: Watcom WMake",
            "# Configuration: Debug",
            "# Directory: sub",
            "# Build root: ..",
        ]
    );
}

#[rstest]
fn rendering_before_configure_is_a_policy_error() {
    let fixture = Fixture::new(&WATCOM_WMAKE, app_and_library());
    let local = LocalGenerator::new(fixture.context(), DirectoryId::ROOT).expect("generator");
    let err = local.render().expect_err("unconfigured");
    assert!(matches!(err, GenerateError::PolicyMisconfiguration(_)));
}

fn utility_with_command(argv: &[&str]) -> TargetGraph {
    let mut graph = TargetGraph::default();
    let stamp = graph
        .add_target("stamp", TargetKind::Utility, DirectoryId::ROOT)
        .expect("stamp");
    let copy = graph
        .add_target("copy", TargetKind::Utility, DirectoryId::ROOT)
        .expect("copy");
    if let Some(target) = graph.target_mut(copy) {
        target
            .commands
            .push(argv.iter().map(|s| (*s).to_owned()).collect());
    }
    let _ = stamp;
    graph
}

#[rstest]
fn unknown_target_file_reference_fails_render() {
    let fixture = Fixture::new(&WATCOM_WMAKE, utility_with_command(&["copy", "$<TARGET_FILE:missing>"]));
    let err = fixture.lowered("").render().expect_err("unresolved");
    assert!(matches!(
        err,
        GenerateError::UnresolvedDependency { ref dependency, .. } if dependency == "missing"
    ));
}

#[rstest]
fn target_file_of_symbolic_target_fails_render() {
    let fixture = Fixture::new(&WATCOM_WMAKE, utility_with_command(&["copy", "$<TARGET_FILE:stamp>"]));
    let err = fixture.lowered("").render().expect_err("no file");
    assert!(matches!(err, GenerateError::NoTargetFile { ref target, .. } if target == "stamp"));
}

#[rstest]
fn multi_line_arguments_are_rejected() {
    let fixture = Fixture::new(&UNIX_MAKEFILES, utility_with_command(&["echo", "a\nb"]));
    let err = fixture.lowered("").render().expect_err("line break");
    assert!(matches!(err, GenerateError::InvalidArgument { .. }));
}

#[rstest]
fn utility_commands_quote_for_the_recipe_shell() {
    let fixture = Fixture::new(&WATCOM_WMAKE, utility_with_command(&["echo", "hello world"]));
    let text = fixture.render("");
    assert!(text.contains("copy : .SYMBOLIC\ncopy :\n\techo \"hello world\"\n"));
}

#[rstest]
fn targets_without_sources_are_skipped() {
    let mut graph = TargetGraph::default();
    let headers = graph
        .add_target("headers", TargetKind::StaticLibrary, DirectoryId::ROOT)
        .expect("headers");
    if let Some(target) = graph.target_mut(headers) {
        target.sources.push("api.h".into());
    }
    let app = graph
        .add_target("app", TargetKind::Executable, DirectoryId::ROOT)
        .expect("app");
    if let Some(target) = graph.target_mut(app) {
        target.sources.push("main.c".into());
    }
    graph
        .add_dependency(app, "headers", DependencyKind::Link)
        .expect("edge");
    let fixture = Fixture::new(&WATCOM_WMAKE, graph);
    assert_eq!(fixture.outputs.get("headers"), Some(&OutputEntry::Empty));
    let local = fixture.lowered("");
    let names: Vec<&str> = local.lowered_targets().map(|(_, n)| n).collect();
    assert_eq!(names, ["app"]);
    let text = local.render().expect("render").join("\n");
    assert!(!text.contains("headers"));
}

#[rstest]
fn extra_steps_attach_to_the_primary_rule() {
    let fixture = Fixture::new(&UNIX_MAKEFILES, app_and_library());
    let mut local = fixture.lowered("");
    local
        .add_rule(
            "app",
            CommandSpec::tool(vec![Token::literal("strip"), Token::TargetFile("app".into())]),
        )
        .expect("add rule");
    let link = local
        .rules()
        .find(|r| r.output == Some(Location::build("bin/app")))
        .expect("link rule");
    assert_eq!(link.commands.len(), 2);
    let err = local
        .add_rule("util", CommandSpec::tool(Vec::new()))
        .expect_err("foreign target");
    assert!(matches!(err, GenerateError::UnresolvedDependency { .. }));
}

#[rstest]
fn long_prerequisite_lists_wrap_with_the_continuation_token() {
    let words: Vec<String> = (0..20).map(|i| format!("object_{i:02}.obj")).collect();
    let lines = render::wrap("app.exe :", &words, "\t", "&");
    assert!(lines.len() > 1);
    for line in lines.iter().take(lines.len() - 1) {
        assert!(line.ends_with(" &"), "{line}");
        assert!(line.len() <= 78, "{line}");
    }
    assert!(lines.iter().skip(1).all(|l| l.starts_with('\t')));
}

#[rstest]
#[case(&UNIX_MAKEFILES, "\techo '$$HOME'\n")]
#[case(&WATCOM_WMAKE, "\techo $$HOME\n")]
fn literal_dollars_are_escaped_for_make(#[case] backend: &'static Backend, #[case] expected: &str) {
    let fixture = Fixture::new(backend, utility_with_command(&["echo", "$HOME"]));
    let text = fixture.render("");
    assert!(text.contains(expected), "{text}");
}

fn compiled(graph: &mut TargetGraph, name: &str, kind: TargetKind, source: &str) -> TargetId {
    let id = graph
        .add_target(name, kind, DirectoryId::ROOT)
        .expect("target");
    if let Some(target) = graph.target_mut(id) {
        target.sources.push(source.into());
    }
    id
}

#[rstest]
fn similar_target_names_keep_separate_flag_variables() {
    let mut graph = TargetGraph::default();
    for (name, define) in [("a-b", "FROM_DASH"), ("a_b", "FROM_UNDERSCORE")] {
        let id = compiled(&mut graph, name, TargetKind::Executable, "main.c");
        if let Some(target) = graph.target_mut(id) {
            target.flags.defines.push(define.into());
        }
    }
    let fixture = Fixture::new(&UNIX_MAKEFILES, graph);
    let local = fixture.lowered("");
    let text = local.render().expect("render").join("\n");
    assert!(text.contains("$(a_2db_DEFINES)"), "{text}");
    assert!(text.contains("$(a__b_DEFINES)"), "{text}");

    let flags: Vec<(String, String)> = local
        .render_flags()
        .expect("flags")
        .into_iter()
        .map(|(path, lines)| (path.into_string(), lines.join("\n")))
        .collect();
    let [(dash_path, dash), (underscore_path, underscore)] = flags.as_slice() else {
        panic!("two flags files expected: {flags:?}");
    };
    assert_eq!(dash_path, "a-b.dir/flags.make");
    assert!(dash.contains("a_2db_DEFINES = -DFROM_DASH"), "{dash}");
    assert_eq!(underscore_path, "a_b.dir/flags.make");
    assert!(underscore.contains("a__b_DEFINES = -DFROM_UNDERSCORE"), "{underscore}");
}

#[rstest]
fn interface_edges_add_link_words_without_prerequisites() {
    let mut graph = TargetGraph::default();
    let wrap = compiled(&mut graph, "mathwrap", TargetKind::StaticLibrary, "wrap.c");
    if let Some(target) = graph.target_mut(wrap) {
        target.interface_link.push("-lm".into());
    }
    let app = compiled(&mut graph, "app", TargetKind::Executable, "main.c");
    graph
        .add_dependency(app, "mathwrap", DependencyKind::Interface)
        .expect("edge");
    let fixture = Fixture::new(&UNIX_MAKEFILES, graph);
    let text = fixture.render("");
    assert!(text.contains("bin/app : app.dir/main.o\n"), "{text}");
    assert!(text.contains("-o bin/app -lm\n"), "{text}");
    assert!(text.contains("\napp :\n"), "{text}");
    assert!(!text.contains("app : mathwrap"), "{text}");
}

#[rstest]
fn shared_libraries_absorb_their_static_dependencies() {
    let mut graph = TargetGraph::default();
    compiled(&mut graph, "util", TargetKind::StaticLibrary, "util.c");
    let core = compiled(&mut graph, "core", TargetKind::SharedLibrary, "core.c");
    let app = compiled(&mut graph, "app", TargetKind::Executable, "main.c");
    graph
        .add_dependency(core, "util", DependencyKind::Link)
        .expect("core -> util");
    graph
        .add_dependency(app, "core", DependencyKind::Link)
        .expect("app -> core");

    let fixture = Fixture::new(&UNIX_MAKEFILES, graph);
    let text = fixture.render("");
    assert!(text.contains("libcore.so : core.dir/core.o libutil.a\n"), "{text}");
    assert!(
        text.contains("\tcc -shared $(core_LINK_FLAGS) -o libcore.so core.dir/core.o libutil.a\n"),
        "{text}"
    );
    assert!(text.contains("bin/app : app.dir/main.o libcore.so\n"), "{text}");
    assert!(
        text.contains("\tcc $(app_LINK_FLAGS) app.dir/main.o -o bin/app libcore.so\n"),
        "{text}"
    );
}

#[rstest]
fn watcom_shared_libraries_are_dlls() {
    let mut graph = TargetGraph::default();
    compiled(&mut graph, "core", TargetKind::SharedLibrary, "core.c");
    let fixture = Fixture::new(&WATCOM_WMAKE, graph);
    assert_eq!(fixture.outputs.file("core"), Some(Utf8Path::new("core.dll")));
    let text = fixture.render("");
    assert!(text.contains("wcl386 -q -bd $(core_LINK_FLAGS) -fe=core.dll"), "{text}");
}
