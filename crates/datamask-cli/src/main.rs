mod commands;
mod logging;
mod output;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{DataModelArgs, GenerateArgs, TransformArgs};
use datamask_generate::{GenerateError, ModuleParseError};
use datamask_transform::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("core error: {0}")]
    Core(#[from] datamask_core::Error),
    #[error("transform config error: {0}")]
    Config(#[from] ConfigError),
    #[error("generate error: {0}")]
    Generate(#[from] GenerateError),
    #[error("config module error: {0}")]
    Module(#[from] ModuleParseError),
    #[error("invalid structure: {0} error(s), see log")]
    InvalidStructure(usize),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("{failed} of {total} row(s) failed to transform")]
    RowsFailed { failed: usize, total: usize },
}

#[derive(Parser, Debug)]
#[command(name = "datamask", version, about = "datamask CLI")]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = settings::DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    /// Append JSON logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the relation-aware data model from a structure file.
    DataModel(DataModelArgs),
    /// Generate a transform config module.
    Generate(GenerateArgs),
    /// Transform a JSONL row stream.
    Transform(TransformArgs),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json, cli.log_file.as_deref())?;
    let settings = settings::load_settings(&cli.settings)?;

    let result = match cli.command {
        Command::DataModel(args) => commands::run_data_model(args),
        Command::Generate(args) => commands::run_generate(args, &settings),
        Command::Transform(args) => commands::run_transform(args, &settings).await,
    };
    if let Err(err) = &result {
        tracing::error!(event = "command_failed", error = %err);
    }
    result
}
