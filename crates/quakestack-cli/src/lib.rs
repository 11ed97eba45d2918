// Target-specific transitive dependency split (mio/crossterm stack) is accepted for now.
#![allow(clippy::multiple_crate_versions)]

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use minus::{ExitStrategy, Pager, page_all};
use quakestack_domain::{ArtifactRef, LayerRef, SynthReport};
use quakestack_engine::{
    CloudFormationSynthesizer, DEFAULT_ARTIFACT_MANIFEST, DEFAULT_BINARY_NAME, StackSettings,
    Synthesizer, assemble, default_observability_layer, write_template,
};
use quakestack_report::{ColorChoice, OutputFormat, RenderOptions, render_synth};
use tracing::info;

mod config;
mod error;
mod logging;

pub use config::{
    ACCOUNT_VAR, API_KEY_VAR, BRANCH_NAME_VAR, DeploymentConfig, LOG_FILTER_VAR, REGION_VAR,
};
pub use error::{CliError, ConfigError};

#[derive(Debug, Parser)]
#[command(
    name = "quakestack",
    about = "Synthesizes the earthquake-trends function, API and Datadog layer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Assemble the stack and write its deployment template.
    Synth {
        /// Directory receiving `<stack>.template.json`.
        #[arg(long, default_value = "cdk.out")]
        output: PathBuf,
        /// Render the stack without writing a template.
        #[arg(long)]
        dry_run: bool,
        /// Build descriptor of the pre-built function binary.
        #[arg(long, default_value = DEFAULT_ARTIFACT_MANIFEST)]
        entry: PathBuf,
        /// Observability layer ARN, replacing the bundled Datadog extension.
        #[arg(long = "layer-arn")]
        layer_arn: Option<LayerRef>,
        #[command(flatten)]
        render: RenderFlags,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Args)]
struct RenderFlags {
    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,
    #[arg(long)]
    verbose: bool,
}

impl RenderFlags {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            color: self.color.into(),
            verbose: self.verbose,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl From<ColorArg> for ColorChoice {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Run the CLI using process arguments and environment.
///
/// # Errors
///
/// Returns an error when argument parsing fails (excluding help/version), a
/// required environment variable is missing, or synthesis fails.
pub fn run() -> std::result::Result<i32, CliError> {
    run_from(std::env::args_os(), |name| std::env::var(name).ok())
}

fn run_from<I, T, F>(args: I, lookup: F) -> std::result::Result<i32, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: Fn(&str) -> Option<String>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(error.into()),
        },
    };

    match cli.command {
        Commands::Synth {
            output,
            dry_run,
            entry,
            layer_arn,
            render,
            format,
        } => {
            logging::init(lookup(LOG_FILTER_VAR).as_deref(), render.verbose);

            let config = DeploymentConfig::from_lookup(&lookup)?;
            let settings = StackSettings {
                artifact: ArtifactRef::new(entry, DEFAULT_BINARY_NAME),
                layer: layer_arn.unwrap_or_else(default_observability_layer),
            };
            let context = &config.context;
            let stack = assemble(
                &context.branch_name,
                &config.secret,
                &context.account,
                &context.region,
                &settings,
            );

            let synthesized = CloudFormationSynthesizer.synthesize(&stack)?;
            let template_path = if dry_run {
                info!(stack = %stack.name, "dry run, template not written");
                None
            } else {
                Some(write_template(&output, &synthesized)?)
            };

            let report = SynthReport {
                stack,
                creation_order: synthesized.creation_order,
                template_digest: synthesized.digest,
                template_path,
            };
            let output_format: OutputFormat = format.into();
            let rendered = render_synth(&report, output_format, &render.render_options())?;
            emit_output(&rendered, output_format);
            Ok(0)
        }
    }
}

fn emit_output(rendered: &str, format: OutputFormat) {
    if format == OutputFormat::Text && should_use_pager() && page_output(rendered).is_ok() {
        return;
    }

    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}

fn should_use_pager() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_PAGER").is_none()
}

fn page_output(rendered: &str) -> std::result::Result<(), minus::MinusError> {
    let pager = Pager::new();
    pager.set_exit_strategy(ExitStrategy::PagerQuit)?;
    pager.set_text(rendered)?;
    page_all(pager)
}
