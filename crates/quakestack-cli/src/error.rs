use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingVariable { name: &'static str },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ArgumentParse(#[from] clap::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Synth(#[from] quakestack_engine::SynthError),
    #[error(transparent)]
    Report(#[from] quakestack_report::ReportError),
}
