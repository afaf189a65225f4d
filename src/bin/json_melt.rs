//! json-melt: Normalize a JSON document into relational CSV tables
//!
//! Usage:
//!   # Read from file, write <table>.csv files into ./out
//!   json-melt data.json -o out
//!
//!   # Read from stdin, print every table to stdout
//!   echo '{"id": 1, "posts": [{"id": 10}]}' | json-melt --stdout
//!
//!   # Inspect the tree and the inferred schema without writing anything
//!   json-melt data.json --print-tree --print-schema

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use json_melt::melt::{CsvDirWriter, Melter, MemorySink};
use json_melt::{Limits, MeltConfig};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "json-melt")]
#[command(about = "Normalize a JSON document into relational CSV tables", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory for the <table>.csv files (default: current directory)
    #[arg(long, short = 'o')]
    out_dir: Option<PathBuf>,

    /// Print every table to stdout instead of writing files
    #[arg(long, conflicts_with = "out_dir")]
    stdout: bool,

    /// Print the parsed tree before melting
    #[arg(long)]
    print_tree: bool,

    /// Print the inferred schema
    #[arg(long)]
    print_schema: bool,

    /// Print the inferred schema as JSON
    #[arg(long)]
    schema_json: bool,

    /// Maximum number of tables (default: 100)
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_tables: Option<usize>,

    /// Maximum number of columns per table, identity included (default: 128)
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_columns: Option<usize>,

    /// Table name for an unrecognised root object (default: "root")
    #[arg(long)]
    root_name: Option<String>,

    /// Name nested objects after their type/kind/name string values
    #[arg(long)]
    name_from_values: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Args) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    // Build config
    let mut config = MeltConfig::default();
    let defaults = Limits::default();
    config.limits = Limits {
        max_tables: args.max_tables.unwrap_or(defaults.max_tables),
        max_columns: args.max_columns.unwrap_or(defaults.max_columns),
    };
    if let Some(name) = args.root_name.clone() {
        config.root_table = name;
    }
    config.name_from_values = args.name_from_values;

    let input = read_input(args.input.as_ref())?;

    let mut melter = Melter::new(config);
    let document = melter.parse(&input).context("Failed to parse JSON")?;
    let registry = melter.infer(&document);

    let mut stdout = std::io::stdout().lock();
    if args.print_tree {
        write!(stdout, "{}", document.render())?;
    }
    if args.print_schema {
        write!(stdout, "{}", registry)?;
    }
    if args.schema_json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&registry)?)?;
    }

    let report = if args.stdout {
        let mut sink = MemorySink::new();
        let report = melter.emit(&document, &registry, &mut sink);
        sink.write_to(&mut stdout).context("Failed to write to stdout")?;
        report
    } else {
        let out_dir = args.out_dir.unwrap_or_else(|| PathBuf::from("."));
        let mut writer = CsvDirWriter::new(&out_dir)
            .with_context(|| format!("Failed to prepare output directory {}", out_dir.display()))?;
        melter.emit(&document, &registry, &mut writer)
    };

    info!(
        tables = registry.len(),
        records = report.records,
        errors = report.errors.len(),
        "melt finished"
    );
    for diagnostic in registry.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }
    for err in &report.errors {
        eprintln!("error: {}", err);
    }

    if report.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<Vec<u8>> {
    let mut reader = if let Some(file_path) = path {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path.display()))?;
        Box::new(BufReader::new(file)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;
    Ok(content)
}
