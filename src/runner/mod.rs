//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. Generation loads the manifest, resolves the
//! project and writes the makefile tree; `build` then hands the tree to the
//! native make tool, streaming its output back to the user.

mod error;
mod output;
mod paths;
mod process;

pub use error::RunnerError;
pub use process::{resolve_make_program, run_build};

use crate::backend::{Backend, BuildRequest};
use crate::cli::{BuildArgs, Cli, Commands, DEFAULT_GENERATOR};
use crate::config::{BUILD_TYPE, DefinitionStore, Definitions};
use crate::generator::{GlobalGenerator, WriteReport};
use crate::manifest;
use crate::project::Project;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use paths::{
    ensure_manifest_exists_or_error, resolve_build_dir, resolve_manifest_path, source_root_from,
};

/// Language enabled when a manifest names none.
pub const DEFAULT_LANGUAGE: &str = "C";

/// Result of a completed generation run.
#[derive(Debug)]
pub struct GenerateOutcome {
    /// Generator left in the `Written` state.
    pub generator: GlobalGenerator,
    /// Build directory the tree was written to.
    pub build_dir: Utf8PathBuf,
    /// What the write touched.
    pub report: WriteReport,
}

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if manifest loading, generation or the make process
/// fails.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Commands::Generate);
    match command {
        Commands::Generate => handle_generate(cli),
        Commands::Build(args) => handle_build(cli, &args),
        Commands::ListGenerators => handle_list_generators(),
        Commands::BuildCommand(args) => handle_build_command(cli, &args),
    }
}

fn backend(cli: &Cli) -> Result<&'static Backend> {
    Backend::by_name(&cli.generator).ok_or_else(|| anyhow!("unknown generator '{}'", cli.generator))
}

/// Load the manifest named by `cli`, generate its makefile tree and write it
/// to the build directory.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or resolved, a language
/// is unsupported, generation fails, or the tree cannot be written. Only the
/// last of these touches the build directory.
pub fn generate(cli: &Cli) -> Result<GenerateOutcome> {
    let backend = backend(cli)?;
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists_or_error(cli, &manifest_path)?;
    let manifest = manifest::from_path(&manifest_path)?;
    let build_dir = resolve_build_dir(cli)?;
    let source_root = source_root_from(&manifest_path, &build_dir)?;
    let project = Project::from_manifest(&manifest, source_root)
        .with_context(|| format!("failed to resolve project '{}'", manifest.project))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let project_json =
            serde_json::to_string_pretty(&project).context("failed to serialise project")?;
        debug!("Project:\n{project_json}");
    }

    let mut store: Definitions = project.definitions.clone();
    if let Some(build_type) = &project.build_type
        && store.get_definition(BUILD_TYPE).is_none()
    {
        store.add_definition(BUILD_TYPE, build_type);
    }
    let languages = if project.languages.is_empty() {
        vec![DEFAULT_LANGUAGE.to_owned()]
    } else {
        project.languages.clone()
    };

    let mut generator =
        GlobalGenerator::new(backend)?.with_configuration(cli.configuration.clone());
    generator.enable_language(&languages, &mut store)?;
    let tree = generator.generate(&project)?;
    let report = generator.write(&tree, &build_dir)?;
    Ok(GenerateOutcome {
        generator,
        build_dir,
        report,
    })
}

fn handle_generate(cli: &Cli) -> Result<()> {
    let outcome = generate(cli)?;
    let summary = if outcome.report.up_to_date {
        format!("Build files in {} are up to date", outcome.build_dir)
    } else {
        format!(
            "Build files written to {} ({} updated, {} unchanged)",
            outcome.build_dir,
            outcome.report.written.len(),
            outcome.report.unchanged
        )
    };
    output::write_stdout(&[summary])
}

fn build_request<'a>(
    cli: &'a Cli,
    args: &'a BuildArgs,
    program: Option<&'a str>,
) -> BuildRequest<'a> {
    BuildRequest {
        program,
        target: args.target.as_deref(),
        configuration: cli.configuration.as_deref(),
        parallel: cli.jobs,
        extra_flags: &args.tool_flags,
    }
}

/// Generate, then run the native make tool in the build directory.
fn handle_build(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let outcome = generate(cli)?;
    let program = resolve_make_program();
    let request = build_request(cli, args, program.as_deref().map(Utf8Path::as_str));
    let command = outcome.generator.build_command(&request);
    info!(
        generator = outcome.generator.backend().name,
        build_dir = %outcome.build_dir,
        "invoking native build tool"
    );
    run_build(&command, &outcome.build_dir).map_err(|source| RunnerError::BuildFailed {
        program: command.program.clone(),
        source,
    })?;
    Ok(())
}

fn handle_build_command(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let generator = GlobalGenerator::new(backend(cli)?)?;
    let program = resolve_make_program();
    let request = build_request(cli, args, program.as_deref().map(Utf8Path::as_str));
    let line = generator
        .build_command(&request)
        .to_command_line()
        .context("failed to quote the build command")?;
    output::write_stdout(&[line])
}

fn handle_list_generators() -> Result<()> {
    let width = Backend::all()
        .iter()
        .map(|b| b.name.len())
        .max()
        .unwrap_or_default();
    let lines: Vec<String> = Backend::all()
        .iter()
        .map(|backend| {
            let (name, brief) = backend.documentation();
            let marker = if name == DEFAULT_GENERATOR { '*' } else { ' ' };
            format!("{marker} {name:<width$} = {brief}")
        })
        .collect();
    output::write_stdout(&lines)
}
