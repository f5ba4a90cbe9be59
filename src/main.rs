//! cellforge CLI - transform one column of a delimited file
//!
//! # Commands
//!
//! ```bash
//! cellforge transform input.csv -c barcode -t reverse   # Transform a column
//! cellforge parse input.csv                             # Parse to JSON rows
//! cellforge transforms                                  # List built-in transforms
//! cellforge serve                                       # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use cellforge::{
    derive_output_name, parse_file, transform_file, transforms_description, BuiltinTransform,
    ParseOptions, TransformOptions,
};

#[derive(Parser)]
#[command(name = "cellforge")]
#[command(about = "Transform one column of a delimited file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a delimited file and output JSON rows
    Parse {
        /// Input file
        input: PathBuf,

        /// Delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Keep every cell as text instead of typing cells
        #[arg(long)]
        no_infer: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transform the designated column and write the result
    Transform {
        /// Input file
        input: PathBuf,

        /// Designated column (header name)
        #[arg(short, long)]
        column: String,

        /// Transform spec, e.g. reverse, mask:4, replace:<pat>:<rep>
        #[arg(short, long, default_value = "reverse")]
        transform: String,

        /// Delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Max in-flight cell transforms
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Keep every cell as text instead of typing cells
        #[arg(long)]
        no_infer: bool,

        /// Output file (default: input name with _processed suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List built-in transforms
    Transforms,

    /// Start HTTP server
    Serve {
        /// Port to listen on (CELLFORGE_PORT overrides the default)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            no_infer,
            output,
        } => cmd_parse(&input, delimiter, no_infer, output.as_deref()),

        Commands::Transform {
            input,
            column,
            transform,
            delimiter,
            concurrency,
            no_infer,
            output,
        } => {
            cmd_transform(
                &input,
                &column,
                &transform,
                delimiter,
                concurrency,
                no_infer,
                output.as_deref(),
            )
            .await
        }

        Commands::Transforms => cmd_transforms(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    no_infer: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing: {}", input.display());

    let options = ParseOptions {
        delimiter,
        infer_types: !no_infer,
    };
    let result = parse_file(input, &options)?;

    eprintln!("  Encoding: {}", result.encoding);
    eprintln!("  Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("  Columns: {}", result.headers.join(", "));
    eprintln!("  Rows: {}", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(json.as_bytes(), output)?;

    Ok(())
}

async fn cmd_transform(
    input: &Path,
    column: &str,
    transform_spec: &str,
    delimiter: Option<char>,
    concurrency: usize,
    no_infer: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Processing: {}", input.display());

    let transform: BuiltinTransform = transform_spec.parse()?;

    let options = TransformOptions {
        delimiter,
        infer_types: !no_infer,
        concurrency,
        cancel: None,
    };

    let result = transform_file(input, column, &transform, options).await?;

    eprintln!("  Encoding: {}", result.csv_info.encoding);
    eprintln!(
        "  Delimiter: '{}'",
        format_delimiter(result.csv_info.delimiter)
    );
    eprintln!("  Rows: {}", result.csv_info.row_count);
    eprintln!("  Outcome: {}", result.outcome.summary());

    for failure in result.outcome.failures.iter().take(5) {
        eprintln!("  Row {}: {}", failure.row, failure.message);
    }
    if result.outcome.failures.len() > 5 {
        eprintln!("  ... {} more failures", result.outcome.failures.len() - 5);
    }

    // Default output name: input stem + _processed suffix, next to the input.
    let default_output = input.with_file_name(derive_output_name(
        input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("output.csv"),
    ));
    let target = output.unwrap_or_else(|| default_output.as_path());
    fs::write(target, &result.output)?;
    eprintln!("Output written to: {}", target.display());

    Ok(())
}

fn cmd_transforms() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", transforms_description());
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let port = match port {
        Some(p) => p,
        None => std::env::var("CELLFORGE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000),
    };
    cellforge::server::start_server(port).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &[u8], path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", String::from_utf8_lossy(content));
        }
    }
    Ok(())
}
