//! jpegpipe CLI - inspect and clean JPEG files through the stream bridge.
//!
//! Files are read in fixed-size chunks and never loaded whole, so the same
//! commands work on pipes (`-i -`) and on very large inputs.

use clap::{Parser, Subcommand};
use jpegpipe_rs::constants::STREAM_BUFFER_SIZE;
use jpegpipe_rs::markers::{scan_segments, strip_metadata};
use jpegpipe_rs::stream::{ForwardStream, InputStream, IoStream};
use jpegpipe_rs::transcoder::{run_source_job, run_stream_job};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

/// Streaming JPEG marker tools
#[derive(Parser)]
#[command(name = "jpegpipe")]
#[command(author = "jpegpipe-rs contributors")]
#[command(version)]
#[command(about = "Inspect and strip JPEG streams chunk by chunk", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegpipe scan -i photo.jpg
    cat photo.jpg | jpegpipe scan -i -
    jpegpipe strip -i photo.jpg -o clean.jpg --buffer-size 4096

Set RUST_LOG=debug to trace buffer fills and flushes.")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List marker segments up to the first scan
    #[command(visible_alias = "s")]
    Scan {
        /// Input JPEG file, or `-` for standard input
        #[arg(short, long)]
        input: PathBuf,

        /// Chunk size used when reading
        #[arg(long, default_value_t = STREAM_BUFFER_SIZE)]
        buffer_size: usize,
    },

    /// Copy a JPEG dropping EXIF, XMP, ICC, comments and other metadata
    Strip {
        /// Input JPEG file, or `-` for standard input
        #[arg(short, long)]
        input: PathBuf,

        /// Output JPEG file
        #[arg(short, long)]
        output: PathBuf,

        /// Chunk size used when reading and writing
        #[arg(long, default_value_t = STREAM_BUFFER_SIZE)]
        buffer_size: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan { input, buffer_size } => scan_file(&input, buffer_size),
        Commands::Strip {
            input,
            output,
            buffer_size,
        } => strip_file(&input, &output, buffer_size),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn open_input(path: &Path) -> io::Result<Box<dyn InputStream>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(ForwardStream::new(io::stdin().lock())))
    } else {
        Ok(Box::new(IoStream::new(File::open(path)?)))
    }
}

fn scan_file(input: &Path, buffer_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let stream = open_input(input)?;
    let segments = run_source_job(stream, buffer_size, scan_segments)?;

    println!("File: {:?}", input);
    println!("  offset  marker");
    for segment in &segments {
        println!("{}", segment);
    }
    println!("✓ {} segments before entropy-coded data", segments.len());
    Ok(())
}

fn strip_file(
    input: &Path,
    output: &Path,
    buffer_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let stream = open_input(input)?;
    let sink = IoStream::new(BufWriter::new(File::create(output)?));
    let summary = run_stream_job(stream, sink, buffer_size, strip_metadata)?;

    println!(
        "✓ Kept {} segments, dropped {} ({} bytes) to {:?}",
        summary.segments_kept, summary.segments_dropped, summary.bytes_dropped, output
    );
    Ok(())
}
