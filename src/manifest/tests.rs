//! Tests for manifest parsing.

use super::*;
use crate::ast::{CommandLine, StringOrList};
use crate::graph::TargetKind;
use miette::Diagnostic;
use rstest::{fixture, rstest};

#[fixture]
fn manifest_yaml() -> &'static str {
    r#"
makegen_version: "1.0.0"
project: demo
languages: [C, CXX]
build_type: Release
definitions:
  GENERATOR_CC: wcc386
directories: [lib]
targets:
  - name: util
    kind: static-library
    directory: lib
    sources: [util.c, util.h]
    flags:
      defines: [UTIL_STATIC]
    config:
      Debug:
        compile: [-d2]
    interface_link: [clib3r.lib]
  - name: app
    kind: executable
    sources: main.c
    link: util
    post_build:
      - "echo built app"
  - name: version
    kind: utility
    commands:
      - [python, gen.py, --out, version.h]
    outputs: version.h
"#
}

#[rstest]
fn parses_a_complete_manifest(manifest_yaml: &str) {
    let manifest = from_str(manifest_yaml).expect("parse");
    assert_eq!(manifest.project, "demo");
    assert_eq!(manifest.languages.to_vec(), ["C", "CXX"]);
    assert_eq!(manifest.build_type.as_deref(), Some("Release"));
    assert_eq!(
        manifest.definitions.get("GENERATOR_CC").map(String::as_str),
        Some("wcc386")
    );
    let kinds: Vec<TargetKind> = manifest.targets.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TargetKind::StaticLibrary,
            TargetKind::Executable,
            TargetKind::Utility
        ]
    );
    let app = manifest.targets.get(1).expect("app");
    assert_eq!(app.sources, StringOrList::String("main.c".into()));
    assert_eq!(app.post_build, [CommandLine::Line("echo built app".into())]);
    let util = manifest.targets.first().expect("util");
    assert_eq!(
        util.config.get("Debug").map(|f| f.compile.clone()),
        Some(vec!["-d2".to_owned()])
    );
}

#[rstest]
#[case("echo hi", Some(vec!["echo", "hi"]))]
#[case("echo 'a b'", Some(vec!["echo", "a b"]))]
#[case("echo 'open", None)]
fn command_lines_split_with_shell_rules(#[case] line: &str, #[case] expected: Option<Vec<&str>>) {
    let argv = CommandLine::Line(line.into()).to_argv();
    assert_eq!(
        argv,
        expected.map(|words| words.into_iter().map(str::to_owned).collect())
    );
}

#[rstest]
fn unknown_target_kind_reports_a_structure_hint() {
    let yaml = "makegen_version: \"1.0.0\"\nproject: p\ntargets:\n  - name: a\n    kind: program\n";
    let err = from_str_named(yaml, &ManifestName::new("Makegenfile")).expect_err("bad kind");
    let ManifestError::Parse { source, .. } = err else {
        panic!("expected parse error, got {err:?}");
    };
    let help = source.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("static-library"), "{help}");
}

#[rstest]
fn unknown_keys_are_rejected() {
    let yaml = "makegen_version: \"1.0.0\"\nproject: p\ntarget: []\n";
    let err = from_str(yaml).expect_err("unknown key");
    assert!(err.to_string().contains("failed to parse manifest"));
}

#[rstest]
fn other_major_versions_are_rejected() {
    let yaml = "makegen_version: \"2.0.0\"\nproject: p\n";
    let err = from_str_named(yaml, &ManifestName::new("Makegenfile")).expect_err("version");
    assert!(matches!(err, ManifestError::UnsupportedVersion { ref found, .. } if found.major == 2));
}

#[rstest]
fn yaml_syntax_errors_use_the_yaml_code() {
    let yaml = "makegen_version: \"1.0.0\"\nproject: [unterminated\n";
    let err = from_str_named(yaml, &ManifestName::new("Makegenfile")).expect_err("syntax");
    let ManifestError::Parse { source, .. } = err else {
        panic!("expected parse error");
    };
    assert_eq!(
        source.code().map(|c| c.to_string()).as_deref(),
        Some("makegen::yaml::parse")
    );
}
