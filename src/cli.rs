//! CLI: decode JSON documents against record definitions and validate them.
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use vx::record::{Field, Record};
use vx::{tag, Definitions, Descriptor, Report, Validator, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON/NDJSON documents against tagged record definitions
#[derive(Parser, Debug)]
#[command(name = "vx", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode each document as the root record and validate it
    Check(CheckOut),
    /// show how directive strings parse and resolve
    Explain(ExplainOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is validated.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// record definitions (.json)
    #[arg(long, short)]
    schema: PathBuf,

    /// record to decode documents as (defaults to the definition's root)
    #[arg(long)]
    root: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(clap::Parser, Debug)]
struct ExplainOut {
    /// directive strings, e.g. "name=email, required, minLength=3"
    #[arg(required = true)]
    directives: Vec<String>,

    /// declared type of the field the directive is attached to
    #[arg(long, default_value = "any")]
    declared: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

/// One JSON value to validate, with where it came from.
#[derive(Debug)]
struct Document {
    label: String,
    json: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outcome {
    Checked(Report),
    Failed { decode_error: String },
}

#[derive(Serialize)]
struct DocumentResult<'a> {
    document: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let label = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path)
                .with_context(|| format!("failed to read source file ({label})"))?;

            if self.ndjson {
                for (index, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{label}:{}", index + 1);
                    let json = serde_json::from_str(line)
                        .with_context(|| format!("failed to parse JSON ({label})"))?;
                    self.process(label, json, &mut documents)?;
                }
            } else {
                let json = serde_json::from_str(&source)
                    .with_context(|| format!("failed to parse JSON source file ({label})"))?;
                self.process(label, json, &mut documents)?;
            }
        }
        Ok(documents)
    }

    /// Apply the JSON pointer, then the jq filter.
    fn process(&self, label: String, json: serde_json::Value, out: &mut Vec<Document>) -> Result<()> {
        let json = match self.json_pointer.as_deref() {
            None => json,
            Some(pointer) => match json.pointer(pointer) {
                Some(node) => node.clone(),
                None => bail!("JSON pointer {pointer} matched nothing ({label})"),
            },
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { label, json }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &json).with_context(|| {
                    format!("failed to apply jq expression to source file ({label})")
                })?;
                for (index, json) in results.into_iter().enumerate() {
                    out.push(Document { label: format!("{label}#{index}"), json });
                }
            }
        }
        Ok(())
    }
}

impl Outcome {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Failed { .. } => 2,
            Self::Checked(report) if !report.well_formed() => 2,
            Self::Checked(report) if !report.is_valid() => 1,
            Self::Checked(_) => 0,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Explain(target) => target.run(),
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<ExitCode> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read definitions ({})", self.schema.display()))?;
        let mut definitions = Definitions::from_json_str(&source)
            .with_context(|| format!("failed to load definitions ({})", self.schema.display()))?;
        if let Some(root) = self.root.as_deref() {
            definitions = definitions.with_root(root)?;
        }

        let documents = self.input_settings.load_documents()?;
        debug!(documents = documents.len(), root = definitions.root(), "checking");

        let validator = Validator::new();
        let outcomes = documents
            .par_iter()
            .map(|doc| match definitions.decode(&doc.json) {
                Ok(record) => Outcome::Checked(validator.validate_value(&Value::Record(record))),
                Err(error) => Outcome::Failed { decode_error: error.to_string() },
            })
            .collect::<Vec<_>>();

        match self.format {
            Format::Text => print_text(&documents, &outcomes),
            Format::Json => {
                let results = documents
                    .iter()
                    .zip(&outcomes)
                    .map(|(doc, outcome)| DocumentResult { document: &doc.label, outcome })
                    .collect::<Vec<_>>();
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }

        let code = outcomes.iter().map(Outcome::exit_code).max().unwrap_or(0);
        Ok(ExitCode::from(code))
    }
}

impl ExplainOut {
    fn run(&self) -> Result<ExitCode> {
        let declared = Descriptor::parse(&self.declared)
            .with_context(|| format!("invalid declared type '{}'", self.declared))?;
        let validator = Validator::new();
        let mut code = 0;

        for text in &self.directives {
            let parsed = tag::parse(text).directives;
            println!("{}", text.bold());
            if let Some(name) = &parsed.display_name {
                println!("  name  {name}");
            }
            let ty = parsed.declared_type.as_deref().map_or_else(
                || declared.to_string(),
                |raw| Descriptor::parse_lenient(raw).to_string(),
            );
            println!("  type  {ty}");
            for rule in &parsed.rules {
                println!("  rule  {rule}");
            }

            // schema problems come from the engine so they read exactly as in `check`
            let probe = Record::new("explain").with_field(Field::new("field", declared.clone(), text, Value::Null));
            let report = validator.validate_value(&Value::Record(probe));
            if report.well_formed() {
                println!("  {}", "ok".green());
            } else {
                code = 2;
                for error in report.errors() {
                    println!("  {} {}", "error".red(), error.problem);
                }
            }
        }
        Ok(ExitCode::from(code))
    }
}

fn print_text(documents: &[Document], outcomes: &[Outcome]) {
    let mut valid = 0;
    for (doc, outcome) in documents.iter().zip(outcomes) {
        match outcome {
            Outcome::Checked(report) if report.is_valid() => {
                valid += 1;
                println!("{} {}", "✓".green(), doc.label);
            }
            Outcome::Checked(report) => {
                let marker = if report.well_formed() { "✗".red() } else { "✗ schema".red().bold() };
                println!("{marker} {}", doc.label);
                for message in report.messages() {
                    println!("    {message}");
                }
            }
            Outcome::Failed { decode_error } => {
                println!("{} {}", "✗ decode".red().bold(), doc.label);
                println!("    {decode_error}");
            }
        }
    }
    println!("{} documents, {valid} valid, {} invalid", documents.len(), documents.len() - valid);
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    std::fs::read_to_string(path)
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
