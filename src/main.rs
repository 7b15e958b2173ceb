use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::error;
use popcolor::core::configuration::Configuration;
use popcolor::histogram::{self, ColorResult};
use popcolor::thread_pool::ThreadPool;

/// Print the most popular color of each image.
#[derive(Parser, Debug)]
#[command(name = "popcolor", version, about)]
struct Args {
    /// Images to analyze.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Number of workers (defaults to POPCOLOR_MAX_CORES or the available cores).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of images handed to a worker at once.
    #[arg(short, long)]
    chunk_size: Option<usize>,

    /// Process the list this many times.
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Process the images one after the other on the main thread.
    #[arg(long)]
    sequential: bool,
}

fn run(args: Args) -> Result<Vec<ColorResult>, Box<dyn std::error::Error>> {
    let paths: Vec<PathBuf> = std::iter::repeat(args.paths)
        .take(args.repeat)
        .flatten()
        .collect();

    if args.sequential {
        let results = paths
            .iter()
            .map(histogram::compute)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(results);
    }

    let mut pool = match args.workers {
        Some(n) => ThreadPool::with_capacity(n)?,
        None => ThreadPool::new()?,
    };
    let results = match args.chunk_size {
        Some(size) => pool.try_par_map_chunked(paths, size, histogram::compute)?,
        None => pool.try_par_map(paths, histogram::compute)?,
    };
    Ok(results)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    // Fail early on a bad environment, before any image is touched.
    let configuration = match args.workers {
        Some(n) => Configuration::with_workers(n),
        None => Configuration::new_default(),
    };
    if let Err(e) = configuration {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    match run(args) {
        Ok(results) => {
            for res in results {
                println!("{}", res);
            }
            println!("\nTime:  {:?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
