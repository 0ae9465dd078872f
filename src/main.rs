//! Sourcetrace CLI
//!
//! A command-line interface for inspecting, querying, and converting
//! source map files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sourcetrace::envelope::{DecodedSourceMap, SourceMapInput};
use sourcetrace::{Bias, GeneratedNeedle, OriginalNeedle, TraceMap, VERSION};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sourcetrace")]
#[command(author, version, about = "A source map tracing and remapping toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source map file to summarize
    #[arg(value_name = "MAP")]
    file: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a position through a source map
    Trace {
        /// The source map file
        map: PathBuf,

        /// 1-based line to look up
        #[arg(short, long)]
        line: u32,

        /// 0-based column to look up
        #[arg(short, long)]
        column: u32,

        /// Query original→generated for this source instead of
        /// generated→original
        #[arg(short, long)]
        source: Option<String>,

        /// Resolve between-segment queries upward instead of downward
        #[arg(long)]
        least_upper_bound: bool,
    },

    /// Print a map with its mappings decoded to segment arrays
    Decode {
        /// The source map file
        map: PathBuf,
    },

    /// Print a decoded map re-encoded to a VLQ mappings string
    Encode {
        /// The decoded source map file
        map: PathBuf,
    },

    /// Flatten a sectioned map into a standard one
    Flatten {
        /// The sectioned source map file
        map: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Trace {
            map,
            line,
            column,
            source,
            least_upper_bound,
        }) => run_trace(&map, line, column, source.as_deref(), least_upper_bound),
        Some(Commands::Decode { map }) => run_decode(&map),
        Some(Commands::Encode { map }) => run_encode(&map),
        Some(Commands::Flatten { map }) => run_flatten(&map),
        None => match cli.file {
            Some(file) => run_summary(&file),
            None => {
                println!("sourcetrace {VERSION} - source map toolkit");
                println!("Run with --help for usage");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_map(path: &Path) -> Result<TraceMap> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let map_url = path.to_string_lossy();
    TraceMap::from_json(&json, Some(map_url.as_ref()))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn run_summary(path: &Path) -> Result<()> {
    let map = load_map(path)?;
    let rows = map.decoded_mappings()?;
    let segments: usize = rows.iter().map(Vec::len).sum();

    if let Some(file) = &map.file {
        println!("file:     {file}");
    }
    if let Some(root) = &map.source_root {
        println!("root:     {root}");
    }
    println!("lines:    {}", rows.len());
    println!("segments: {segments}");
    println!("names:    {}", map.names.len());
    println!("sources:  {}", map.sources.len());
    for source in map.resolved_sources() {
        println!("  {source}");
    }
    Ok(())
}

fn run_trace(
    path: &Path,
    line: u32,
    column: u32,
    source: Option<&str>,
    least_upper_bound: bool,
) -> Result<()> {
    let map = load_map(path)?;
    let bias = if least_upper_bound {
        Bias::LeastUpperBound
    } else {
        Bias::GreatestLowerBound
    };

    match source {
        Some(source) => {
            let needle = OriginalNeedle::new(source, line, column).with_bias(bias);
            match map.generated_position_for(needle)? {
                Some(pos) => println!("{}:{}", pos.line, pos.column),
                None => println!("no mapping"),
            }
        }
        None => {
            let needle = GeneratedNeedle::new(line, column).with_bias(bias);
            match map.original_position_for(needle)? {
                Some(pos) => {
                    print!("{}:{}:{}", pos.source, pos.line, pos.column);
                    match pos.name {
                        Some(name) => println!(" ({name})"),
                        None => println!(),
                    }
                }
                None => println!("no mapping"),
            }
        }
    }
    Ok(())
}

fn run_decode(path: &Path) -> Result<()> {
    let map = load_map(path)?;
    let decoded = map.decoded_map()?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn run_encode(path: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let decoded: DecodedSourceMap =
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&decoded.encode())?);
    Ok(())
}

fn run_flatten(path: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input: SourceMapInput =
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))?;
    let map_url = path.to_string_lossy();
    let map = TraceMap::new(input, Some(map_url.as_ref()))?;
    println!("{}", serde_json::to_string_pretty(&map.encoded_map())?);
    Ok(())
}
