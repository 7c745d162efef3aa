//! apidsl — parse and validate `.api` service definitions.
//!
//! Two modes:
//!
//! - **stdin mode**: `apidsl < service.api`
//! - **file mode**: `apidsl api/ extra.api 'specs/**/*.api'`; files,
//!   directories (recursive `.api` discovery), and glob patterns, validated
//!   together so cross-file collisions surface.

use anyhow::{Context, Result};
use apidsl::{model::ApiSpec, parser, validate, Dialect};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "apidsl", about = "Parse and validate .api service definitions")]
struct Cli {
    /// Input files, directories, or glob patterns. If omitted, reads stdin.
    inputs: Vec<String>,

    /// Output format: summary (default) or json
    #[arg(short = 'f', long, default_value = "summary")]
    format: String,

    /// Extra annotation block names to recognize, besides doc and server.
    /// Can be specified multiple times.
    #[arg(long = "annotation")]
    annotations: Vec<String>,

    /// Suppress warnings
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut dialect = Dialect::default();
    for name in &cli.annotations {
        dialect.push(name);
    }

    if cli.inputs.is_empty() {
        return stdin_mode(&cli, &dialect);
    }
    file_mode(&cli, &dialect)
}

/// stdin mode: parse one specification from standard input.
fn stdin_mode(cli: &Cli, dialect: &Dialect) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let spec = parser::parse_str_with(&input, dialect)?;
    report_warnings(cli, &spec);
    emit(cli, &[(PathBuf::from("<stdin>"), spec)])
}

/// file mode: parse every input, then validate the set as an aggregate.
fn file_mode(cli: &Cli, dialect: &Dialect) -> Result<()> {
    let files = expand_inputs(&cli.inputs)?;

    let mut parsed = Vec::new();
    for path in &files {
        let spec = parser::parse_file_with(path, dialect)?;
        report_warnings(cli, &spec);
        parsed.push((path.clone(), spec));
    }
    validate::validate_aggregate(&parsed)?;

    emit(cli, &parsed)
}

fn report_warnings(cli: &Cli, spec: &ApiSpec) {
    if cli.quiet {
        return;
    }
    for warning in validate::warnings(spec) {
        eprintln!("warning: {warning}");
    }
}

fn emit(cli: &Cli, parsed: &[(PathBuf, ApiSpec)]) -> Result<()> {
    match cli.format.as_str() {
        "summary" => {
            for (path, spec) in parsed {
                println!(
                    "{}: service {:?}, {} types, {} routes",
                    path.display(),
                    spec.service.name,
                    spec.types.len(),
                    spec.service.route_count()
                );
            }
            Ok(())
        }
        "json" => {
            let docs: Vec<_> = parsed
                .iter()
                .map(|(path, spec)| {
                    serde_json::json!({ "file": path.display().to_string(), "spec": spec })
                })
                .collect();
            // A single spec dumps bare, a set dumps as an array.
            let out = if docs.len() == 1 {
                serde_json::to_string_pretty(&docs[0])?
            } else {
                serde_json::to_string_pretty(&docs)?
            };
            println!("{out}");
            Ok(())
        }
        other => anyhow::bail!("unknown format: {other}. Use summary or json"),
    }
}

/// Expand the input arguments into a sorted, de-duplicated file list.
/// Directories are walked recursively for `.api` files; other arguments are
/// tried as literal paths, then as glob patterns.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let found = parser::discover_api_files(path)
                .with_context(|| format!("failed to scan directory: {input}"))?;
            if found.is_empty() {
                eprintln!("warning: no .api files under: {input}");
            }
            files.extend(found);
            continue;
        }
        let matches: Vec<_> = glob::glob(input)
            .with_context(|| format!("invalid glob pattern: {input}"))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            eprintln!("warning: no files matched: {input}");
        }
        files.extend(matches);
    }
    files.sort();
    files.dedup();
    Ok(files)
}
