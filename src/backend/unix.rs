//! Unix Makefiles backend.

use super::invocation::{BuildCommand, BuildRequest, BuildToolInvocation, note_configuration, tool_args};
use super::{Backend, ConfigDefaults, ToolchainDefaults};
use crate::config::{Language, NamingConvention, RuleTemplates};
use crate::policy::{GeneratorPolicy, PathConvention, PhonyStyle, PolicyError};
use crate::quote::ShellFlavor;

/// The Unix Makefiles backend.
pub static UNIX_MAKEFILES: Backend = Backend {
    name: "Unix Makefiles",
    slug: "unix-makefiles",
    brief: "Generates standard UNIX makefiles.",
    make_program_file: "FindUnixMake.cmake",
    make_program: "make",
    makefile_name: "Makefile",
    toolchain: ToolchainDefaults {
        compilers: &[
            (Language::C, "cc"),
            (Language::Cxx, "c++"),
            (Language::Fortran, "gfortran"),
            (Language::Asm, "as"),
        ],
        templates: RuleTemplates {
            compile: "<COMPILER> <DEFINES> <INCLUDES> <FLAGS> -o <OBJECT> -c <SOURCE>",
            static_archive: "ar rcs <TARGET> <OBJECTS>",
            shared_link: "<COMPILER> -shared <LINK_FLAGS> -o <TARGET> <OBJECTS> <LINK_LIBRARIES>",
            executable_link: "<COMPILER> <LINK_FLAGS> <OBJECTS> -o <TARGET> <LINK_LIBRARIES>",
            define_flag: "-D",
            include_flag: "-I",
        },
        naming: NamingConvention {
            object_suffix: ".o",
            library_prefix: "lib",
            static_suffix: ".a",
            shared_suffix: ".so",
            executable_suffix: "",
        },
        default_configuration: "Debug",
        config_flags: &[
            ConfigDefaults {
                name: "Debug",
                compile: &["-g"],
                defines: &[],
                link: &[],
            },
            ConfigDefaults {
                name: "Release",
                compile: &["-O3"],
                defines: &["NDEBUG"],
                link: &[],
            },
            ConfigDefaults {
                name: "RelWithDebInfo",
                compile: &["-O2", "-g"],
                defines: &["NDEBUG"],
                link: &[],
            },
            ConfigDefaults {
                name: "MinSizeRel",
                compile: &["-Os"],
                defines: &["NDEBUG"],
                link: &[],
            },
        ],
        definitions: &[],
    },
    policy: unix_policy,
    invocation: &MakeInvocation,
};

fn unix_policy() -> Result<GeneratorPolicy, PolicyError> {
    GeneratorPolicy::builder()
        .path_convention(PathConvention::Unix)
        .line_continuation("\\")
        .silent_flag("-s")
        .phony_style(PhonyStyle::PhonyTarget(".PHONY".into()))
        .include_directive("include")
        .shell_has_cd(true)
        .command_separator("&&")
        .tool_supports_color(true)
        .build()
}

/// GNU and BSD make both accept `-j N`.
#[derive(Debug)]
struct MakeInvocation;

impl BuildToolInvocation for MakeInvocation {
    fn compose(&self, request: &BuildRequest<'_>, default_program: &str) -> BuildCommand {
        note_configuration(request);
        BuildCommand {
            program: request.program.unwrap_or(default_program).to_owned(),
            args: tool_args(&[], request.parallel, request),
            flavor: ShellFlavor::Posix,
        }
    }
}
