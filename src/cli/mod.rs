//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands, and merges
//! configuration files and `MAKEGEN_*` environment variables over the parsed
//! values with `ortho_config`.

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use make_env::CONFIG_PATH_ENV;
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoMergeExt, OrthoResult, sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

mod parsing;

use parsing::{parse_generator, parse_jobs};

/// Maximum number of jobs accepted by the CLI.
const MAX_JOBS: usize = 64;
const ENV_PREFIX: &str = "MAKEGEN_";

/// Generate WMake, make or NMake makefiles from a YAML project description.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "MAKEGEN")]
pub struct Cli {
    /// Path to the project manifest.
    #[arg(short, long, value_name = "FILE", default_value = "Makegenfile")]
    #[ortho_config(default = default_manifest_path())]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// This affects manifest lookup, the build directory, and config
    /// discovery.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Directory that receives the generated makefiles.
    #[arg(short = 'B', long, value_name = "DIR", default_value = "build")]
    #[ortho_config(default = default_build_dir())]
    pub build_dir: PathBuf,

    /// Makefile flavour to generate; see `list-generators`.
    #[arg(
        short = 'G',
        long,
        value_name = "NAME",
        default_value = DEFAULT_GENERATOR,
        value_parser = parse_generator
    )]
    #[ortho_config(default = default_generator())]
    pub generator: String,

    /// Set the number of parallel build jobs.
    ///
    /// Values must be between 1 and 64.
    #[arg(short, long, value_name = "N", global = true, value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Build configuration such as `Debug` or `Release`.
    #[arg(long = "config", value_name = "NAME", global = true)]
    pub configuration: Option<String>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Subcommand to execute; defaults to `generate` when omitted.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

/// Generator used when none is named.
pub const DEFAULT_GENERATOR: &str = "Unix Makefiles";

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate);
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: default_manifest_path(),
            directory: None,
            build_dir: default_build_dir(),
            generator: default_generator(),
            jobs: None,
            configuration: None,
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Arguments accepted by `build` and `build-command`.
#[derive(Debug, Args, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct BuildArgs {
    /// Target to build instead of the default goal.
    #[arg(long, value_name = "TARGET")]
    pub target: Option<String>,

    /// Extra flags passed through to the native tool.
    #[arg(last = true, value_name = "FLAGS")]
    #[serde(default)]
    pub tool_flags: Vec<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Generate the makefile tree into the build directory.
    Generate,

    /// Generate, then run the native make tool.
    Build(BuildArgs),

    /// Print every available generator with a short description.
    ListGenerators,

    /// Print the native build command without running it.
    BuildCommand(BuildArgs),
}

/// Return the default manifest filename when none is provided.
fn default_manifest_path() -> PathBuf {
    PathBuf::from("Makegenfile")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_generator() -> String {
    DEFAULT_GENERATOR.to_owned()
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|err| err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

/// Build configuration discovery rooted in the optional working directory.
fn config_discovery(directory: Option<&PathBuf>) -> ConfigDiscovery {
    let mut builder = ConfigDiscovery::builder("makegen").env_var(CONFIG_PATH_ENV);
    if let Some(dir) = directory {
        builder = builder.clear_project_roots().add_project_root(dir);
    }
    builder.build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let mut map = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(ortho_config::OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    // Fields with clap defaults count only when typed on the command line.
    for field in ["file", "build_dir", "generator", "verbose"] {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// Layers apply in order: defaults, discovered `makegen.toml` files (or the
/// file named by `MAKEGEN_CONFIG_PATH`), `MAKEGEN_*` environment variables,
/// then the command line.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let command = cli.command.clone();
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let discovery = config_discovery(cli.directory.as_ref());
    let mut file_layers = discovery.compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    let mut merged = composition.into_merge_result(Cli::merge_from_layers)?;
    merged.command = command;
    Ok(merged)
}
