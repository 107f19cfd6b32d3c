//! NMake Makefiles backend.

use tracing::debug;

use super::invocation::{BuildCommand, BuildRequest, BuildToolInvocation, note_configuration, tool_args};
use super::{Backend, ConfigDefaults, ToolchainDefaults};
use crate::config::{Language, NamingConvention, RuleTemplates};
use crate::policy::{GeneratorPolicy, PathConvention, PhonyStyle, PolicyError};
use crate::quote::ShellFlavor;

/// The NMake Makefiles backend.
pub static NMAKE: Backend = Backend {
    name: "NMake Makefiles",
    slug: "nmake-makefiles",
    brief: "Generates NMake makefiles.",
    make_program_file: "FindNMake.cmake",
    make_program: "nmake",
    makefile_name: "Makefile",
    toolchain: ToolchainDefaults {
        compilers: &[(Language::C, "cl"), (Language::Cxx, "cl"), (Language::Asm, "ml")],
        templates: RuleTemplates {
            compile: "<COMPILER> /nologo <DEFINES> <INCLUDES> <FLAGS> /Fo<OBJECT> /c <SOURCE>",
            static_archive: "lib /nologo /out:<TARGET> <OBJECTS>",
            shared_link: "link /nologo /dll <LINK_FLAGS> /out:<TARGET> <OBJECTS> <LINK_LIBRARIES>",
            executable_link: "link /nologo <LINK_FLAGS> /out:<TARGET> <OBJECTS> <LINK_LIBRARIES>",
            define_flag: "/D",
            include_flag: "/I",
        },
        naming: NamingConvention {
            object_suffix: ".obj",
            library_prefix: "",
            static_suffix: ".lib",
            shared_suffix: ".dll",
            executable_suffix: ".exe",
        },
        default_configuration: "Debug",
        config_flags: &[
            ConfigDefaults {
                name: "Debug",
                compile: &["/Zi", "/Od"],
                defines: &["_DEBUG"],
                link: &["/debug"],
            },
            ConfigDefaults {
                name: "Release",
                compile: &["/O2"],
                defines: &["NDEBUG"],
                link: &[],
            },
            ConfigDefaults {
                name: "RelWithDebInfo",
                compile: &["/O2", "/Zi"],
                defines: &["NDEBUG"],
                link: &["/debug"],
            },
            ConfigDefaults {
                name: "MinSizeRel",
                compile: &["/O1"],
                defines: &["NDEBUG"],
                link: &[],
            },
        ],
        definitions: &[("MSVC_MAKE", "1")],
    },
    policy: nmake_policy,
    invocation: &NMakeInvocation,
};

fn nmake_policy() -> Result<GeneratorPolicy, PolicyError> {
    GeneratorPolicy::builder()
        .path_convention(PathConvention::Windows)
        .line_continuation("\\")
        .silent_flag("/nologo")
        .phony_style(PhonyStyle::Implicit)
        .include_directive("!include")
        .shell_has_cd(true)
        .command_separator("&&")
        .windows_shell(true)
        .pass_makeflags(true)
        .empty_rule_command("@cd .")
        .build()
}

/// NMake has no job flag and always wants `/nologo`.
#[derive(Debug)]
struct NMakeInvocation;

impl BuildToolInvocation for NMakeInvocation {
    fn compose(&self, request: &BuildRequest<'_>, default_program: &str) -> BuildCommand {
        note_configuration(request);
        if let Some(jobs) = request.parallel {
            debug!(jobs, "nmake has no job flag; building serially");
        }
        BuildCommand {
            program: request.program.unwrap_or(default_program).to_owned(),
            args: tool_args(&["/nologo"], None, request),
            flavor: ShellFlavor::Windows,
        }
    }
}
