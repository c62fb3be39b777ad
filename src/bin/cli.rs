//! SlotKV CLI
//!
//! Command-line interface over a local SlotKV data directory.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use slotkv::{Config, Engine, FieldKind, KvError, Record, Result, Schema, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// SlotKV CLI
#[derive(Parser, Debug)]
#[command(name = "slotkv-cli")]
#[command(about = "CLI for the SlotKV storage engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./slotkv_data")]
    data_dir: PathBuf,

    /// Page size in bytes
    #[arg(short, long, default_value = "8192")]
    page_size: usize,

    /// Entries per index bucket
    #[arg(short, long, default_value = "10")]
    bucket_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a record from one value per schema field
    Create {
        /// Field values, in schema order
        values: Vec<String>,
    },

    /// Print the record stored under a key
    Get {
        key: u32,
    },

    /// Replace the record stored under a key
    Update {
        key: u32,

        /// Field values, in schema order
        values: Vec<String>,
    },

    /// Delete the record stored under a key
    Delete {
        key: u32,
    },

    /// Create every record of a file, one `|`-separated record per line
    Load {
        file: PathBuf,
    },

    /// Print every record
    Scan,

    /// Verify the index invariants
    Check,

    /// Print page and index statistics
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,slotkv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .page_size(args.page_size)
        .bucket_capacity(args.bucket_capacity)
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    let schema = config.schema.clone();
    let mut engine = Engine::open(config)?;

    match command {
        Commands::Create { values } => {
            let location = engine.create(&parse_record(&schema, &values)?)?;
            println!("OK {}", location);
        }
        Commands::Get { key } => match engine.read(key)? {
            Some(record) => println!("{}", record),
            None => println!("(nil)"),
        },
        Commands::Update { key, values } => {
            if engine.update(key, &parse_record(&schema, &values)?)? {
                println!("OK");
            } else {
                println!("(nil)");
            }
        }
        Commands::Delete { key } => {
            println!("(integer) {}", engine.delete(key)? as u8);
        }
        Commands::Load { file } => {
            let text = fs::read_to_string(&file)?;
            let records = text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| {
                    let values: Vec<String> =
                        line.split('|').map(|v| v.trim().to_string()).collect();
                    parse_record(&schema, &values)
                })
                .collect::<Result<Vec<_>>>()?;
            println!("(integer) {}", engine.load(records)?);
        }
        Commands::Scan => {
            for record in engine.scan()? {
                println!("{}", record);
            }
        }
        Commands::Check => {
            let violations = engine.check()?;
            if violations.is_empty() {
                println!("OK");
            }
            for violation in violations {
                println!("{}", violation);
            }
        }
        Commands::Stats => {
            println!("pages: {}", engine.page_count());
            for page in 0..engine.page_count() {
                if let Some(free) = engine.free_space(page) {
                    println!("  page {}: {} bytes free", page, free);
                }
            }
            println!("global depth: {}", engine.global_depth());
            println!("directory entries: {}", engine.directory_len());
            println!("resident buckets: {}", engine.resident_buckets());
        }
    }

    engine.close()
}

/// Build a record from raw strings, one per schema field
fn parse_record(schema: &Schema, raw: &[String]) -> Result<Record> {
    if raw.len() != schema.fields().len() {
        return Err(KvError::Encoding(format!(
            "Expected {} values ({}), got {}",
            schema.fields().len(),
            schema
                .fields()
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            raw.len()
        )));
    }

    let values = schema
        .fields()
        .iter()
        .zip(raw)
        .map(|(field, raw)| match field.kind {
            FieldKind::UInt { .. } => raw.parse::<u64>().map(Value::UInt).map_err(|_| {
                KvError::Encoding(format!("Field '{}' expects an integer, got '{}'", field.name, raw))
            }),
            FieldKind::Text => Ok(Value::Text(raw.clone())),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Record::new(values))
}
