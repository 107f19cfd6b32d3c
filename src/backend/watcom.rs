//! Watcom WMake backend.
//!
//! WMake runs recipes under a DOS-style shell without a usable `cd`, marks
//! phony rules with `.SYMBOLIC`, and continues lines with `&`. The Watcom
//! compilers cannot place same-named objects from different directories, so
//! object names are mangled.

use tracing::debug;

use super::invocation::{BuildCommand, BuildRequest, BuildToolInvocation, note_configuration, tool_args};
use super::{Backend, ConfigDefaults, ToolchainDefaults};
use crate::config::{Language, NamingConvention, RuleTemplates};
use crate::policy::{GeneratorPolicy, PathConvention, PhonyStyle, PolicyError};
use crate::quote::ShellFlavor;

/// The Watcom WMake backend.
pub static WATCOM_WMAKE: Backend = Backend {
    name: "Watcom WMake",
    slug: "watcom-wmake",
    brief: "Generates Watcom WMake makefiles.",
    make_program_file: "CMakeFindWMake.cmake",
    make_program: "wmake",
    makefile_name: "Makefile",
    toolchain: ToolchainDefaults {
        compilers: &[(Language::C, "wcl386"), (Language::Cxx, "wcl386")],
        templates: RuleTemplates {
            compile: "<COMPILER> -q <DEFINES> <INCLUDES> <FLAGS> -fo=<OBJECT> -c <SOURCE>",
            static_archive: "wlib -q -b -c -n <TARGET> +<OBJECTS>",
            shared_link: "<COMPILER> -q -bd <LINK_FLAGS> -fe=<TARGET> <OBJECTS> <LINK_LIBRARIES>",
            executable_link: "<COMPILER> -q <LINK_FLAGS> -fe=<TARGET> <OBJECTS> <LINK_LIBRARIES>",
            define_flag: "-d",
            include_flag: "-i=",
        },
        naming: NamingConvention {
            object_suffix: ".obj",
            library_prefix: "lib",
            static_suffix: ".lib",
            shared_suffix: ".dll",
            executable_suffix: ".exe",
        },
        default_configuration: "Debug",
        config_flags: &[
            ConfigDefaults {
                name: "Debug",
                compile: &["-d2"],
                defines: &[],
                link: &["-d2"],
            },
            ConfigDefaults {
                name: "Release",
                compile: &["-ot"],
                defines: &["NDEBUG"],
                link: &[],
            },
            ConfigDefaults {
                name: "RelWithDebInfo",
                compile: &["-ot", "-d1"],
                defines: &["NDEBUG"],
                link: &["-d1"],
            },
            ConfigDefaults {
                name: "MinSizeRel",
                compile: &["-os"],
                defines: &["NDEBUG"],
                link: &[],
            },
        ],
        definitions: &[("WATCOM", "1")],
    },
    policy: watcom_policy,
    invocation: &WMakeInvocation,
};

fn watcom_policy() -> Result<GeneratorPolicy, PolicyError> {
    GeneratorPolicy::builder()
        .path_convention(PathConvention::Windows)
        .line_continuation("&")
        .silent_flag("-h")
        .phony_style(PhonyStyle::Symbolic(".SYMBOLIC".into()))
        .ignore_lib_prefix(true)
        .include_directive("!include")
        .without_cd()
        .windows_shell(true)
        .define_windows_null(true)
        .mangle_object_names(true)
        .quote_include_paths(true)
        .empty_rule_command("@cd .")
        .tool_supports_color(true)
        .build()
}

/// WMake has no job flag; parallel requests are dropped.
#[derive(Debug)]
struct WMakeInvocation;

impl BuildToolInvocation for WMakeInvocation {
    fn compose(&self, request: &BuildRequest<'_>, default_program: &str) -> BuildCommand {
        note_configuration(request);
        if let Some(jobs) = request.parallel {
            debug!(jobs, "wmake has no job flag; building serially");
        }
        BuildCommand {
            program: request.program.unwrap_or(default_program).to_owned(),
            args: tool_args(&["-h"], None, request),
            flavor: ShellFlavor::Windows,
        }
    }
}
