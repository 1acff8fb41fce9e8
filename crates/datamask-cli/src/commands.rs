use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use datamask_core::{
    IntrospectedStructure, ValidationReport, build_data_model, validate_structure,
    validate_structure_json,
};
use datamask_generate::{GenerateOptions, generate_transform, parse_module, parse_predictions};
use datamask_transform::{
    CompiledTransformConfig, Row, RowContext, RowData, SelectConfig, SelectOutcome, Transform,
    TransformMode, TransformOverrides, create_transform_config,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::CliError;
use crate::output::write_output;
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct DataModelArgs {
    /// Introspected structure JSON.
    #[arg(value_name = "STRUCTURE")]
    pub structure: PathBuf,
    /// Output path; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Introspected structure JSON.
    #[arg(value_name = "STRUCTURE")]
    pub structure: PathBuf,
    /// Shape predictions JSON (`TableShapePredictions[]`).
    #[arg(long)]
    pub predictions: Option<PathBuf>,
    /// Select config JSON; overrides `[select]` from the settings file.
    #[arg(long)]
    pub select: Option<PathBuf>,
    /// Subset config JSON, emitted verbatim.
    #[arg(long)]
    pub subset: Option<PathBuf>,
    /// Keep schemas and tables without generated columns.
    #[arg(long, default_value_t = false)]
    pub include_empty: bool,
    /// Seed emitted as `copycat.setHashKey(..)`.
    #[arg(long, value_name = "KEY")]
    pub secret_key: Option<String>,
    /// Output path; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Introspected structure JSON.
    #[arg(value_name = "STRUCTURE")]
    pub structure: PathBuf,
    /// Transform config: a `.json` literal config or a generated module.
    #[arg(long, value_name = "CONFIG")]
    pub config: PathBuf,
    /// JSONL rows (`{"schema", "table", "row"}` per line); `-` for stdin.
    #[arg(long, default_value = "-")]
    pub input: PathBuf,
    /// Output path; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Mode for columns without a transform.
    #[arg(long)]
    pub mode: Option<TransformMode>,
    /// Keep JSON columns as serialized strings.
    #[arg(long, default_value_t = false)]
    pub no_parse_json: bool,
    /// Seed for the deterministic generator.
    #[arg(long, value_name = "KEY")]
    pub hash_key: Option<String>,
}

/// One JSONL record of the transform stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub schema: String,
    pub table: String,
    pub row: Row,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub rows: usize,
    pub transformed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn run_data_model(args: DataModelArgs) -> Result<(), CliError> {
    let structure = load_structure(&args.structure)?;
    let model = build_data_model(&structure)?;
    info!(
        event = "data_model_built",
        models = model.models.len(),
        enums = model.enums.len()
    );
    let mut encoded = serde_json::to_vec_pretty(&model)?;
    encoded.push(b'\n');
    write_output(args.out.as_deref(), &encoded)
}

pub fn run_generate(args: GenerateArgs, settings: &Settings) -> Result<(), CliError> {
    let structure = load_structure(&args.structure)?;

    let table_shape_predictions = match &args.predictions {
        Some(path) => parse_predictions(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    let select = match &args.select {
        Some(path) => Some(SelectConfig::try_from(read_json(path)?)?),
        None => settings.select_config()?,
    };
    let subset = args.subset.as_deref().map(read_json).transpose()?;

    let options = GenerateOptions {
        table_shape_predictions,
        copycat_secret_key: args
            .secret_key
            .or_else(|| settings.generate.copycat_secret_key.clone()),
        include_empty: args.include_empty || settings.generate.include_empty,
        ..GenerateOptions::default()
    };
    let source = generate_transform(&structure.tables, &options, subset.as_ref(), select.as_ref());
    write_output(args.out.as_deref(), source.as_bytes())
}

pub async fn run_transform(args: TransformArgs, settings: &Settings) -> Result<(), CliError> {
    let timer = Instant::now();
    let structure = load_structure(&args.structure)?;
    let LoadedTransform {
        transform,
        select: module_select,
    } = load_transform(&args.config)?;

    let cli_overrides = TransformOverrides {
        mode: args.mode,
        parse_json: args.no_parse_json.then_some(false),
        hash_key: args.hash_key,
    };
    let overrides = settings.transform_overrides().merged_with(&cli_overrides);
    let config = create_transform_config(transform, &structure, overrides).await?;
    // A select block written into the config module wins over settings.
    let select = match module_select {
        Some(select) => Some(select),
        None => settings.select_config()?,
    };

    let reader: Box<dyn BufRead> = if args.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };
    let writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let summary = transform_stream(&config, select.as_ref(), reader, writer)?;
    info!(
        event = "transform_finished",
        rows = summary.rows,
        transformed = summary.transformed,
        skipped = summary.skipped,
        failed = summary.failed,
        duration_ms = timer.elapsed().as_millis() as u64
    );

    if summary.failed > 0 {
        return Err(CliError::RowsFailed {
            failed: summary.failed,
            total: summary.rows,
        });
    }
    Ok(())
}

/// Transform every JSONL record from `reader` into `writer`.
///
/// Failed rows are logged and counted, never written. Rows of tables the
/// select config excludes from data are dropped.
pub fn transform_stream(
    config: &CompiledTransformConfig,
    select: Option<&SelectConfig>,
    reader: impl BufRead,
    mut writer: impl Write,
) -> Result<StreamSummary, CliError> {
    let mut summary = StreamSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        summary.rows += 1;

        let record: RowRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                warn!(line = line_number, error = %err, "skipping malformed row");
                summary.failed += 1;
                continue;
            }
        };

        if let Some(select) = select {
            let outcome = select.resolve(&record.schema, &record.table);
            if outcome != SelectOutcome::Data {
                debug!(
                    line = line_number,
                    schema = %record.schema,
                    table = %record.table,
                    ?outcome,
                    "row excluded by select config"
                );
                summary.skipped += 1;
                continue;
            }
        }

        let RowRecord { schema, table, row } = record;
        let data = RowData::from_parsed(row, line_number);
        let ctx = RowContext {
            schema: &schema,
            table: &table,
            row: &data,
        };
        match config.transform_row(&ctx) {
            Ok(row) => {
                serde_json::to_writer(&mut writer, &RowRecord { schema, table, row })?;
                writer.write_all(b"\n")?;
                summary.transformed += 1;
            }
            Err(errors) => {
                for err in errors.iter() {
                    warn!(
                        line = line_number,
                        schema = %err.schema,
                        table = %err.table,
                        column = err.column.as_deref().unwrap_or("-"),
                        cause = %err.cause,
                        "column transform failed"
                    );
                }
                summary.failed += 1;
            }
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Read, schema-check, decode and semantically check a structure file.
pub fn load_structure(path: &Path) -> Result<IntrospectedStructure, CliError> {
    let value = read_json(path)?;
    let report = validate_structure_json(&value)?;
    log_report(&report);
    if !report.is_ok() {
        return Err(CliError::InvalidStructure(report.errors.len()));
    }

    let structure: IntrospectedStructure = serde_json::from_value(value)?;
    let report = validate_structure(&structure);
    log_report(&report);
    if !report.is_ok() {
        return Err(CliError::InvalidStructure(report.errors.len()));
    }

    info!(
        event = "structure_loaded",
        path = %path.display(),
        tables = structure.tables.len(),
        enums = structure.enums.len()
    );
    Ok(structure)
}

/// A transform config plus the select block it carries, if any.
#[derive(Debug)]
pub struct LoadedTransform {
    pub transform: Transform,
    pub select: Option<SelectConfig>,
}

/// `.json` files are literal configs; anything else is a config module.
pub fn load_transform(path: &Path) -> Result<LoadedTransform, CliError> {
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        return Ok(LoadedTransform {
            transform: Transform::from_json(&read_json(path)?)?,
            select: None,
        });
    }
    let module = parse_module(&std::fs::read_to_string(path)?)?;
    debug!(
        path = %path.display(),
        tables = module.tables.len(),
        has_select = module.select.is_some(),
        "loaded config module"
    );
    Ok(LoadedTransform {
        transform: module.to_transform(),
        select: module.select,
    })
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn log_report(report: &ValidationReport) {
    for issue in &report.errors {
        error!(code = %issue.code, path = %issue.path, hint = ?issue.hint, "{}", issue.message);
    }
    for issue in &report.warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
}
