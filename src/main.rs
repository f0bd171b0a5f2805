use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vidlsh::{
    evaluate_files, format_pair, map_stream, reduce_stream, run_local_lines, JobConfig,
    LocalOptions, Mapper, SimilarPair,
};

#[derive(Parser)]
#[command(name = "vidlsh", version, about = "Near-duplicate video detection with MinHash and LSH")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter, e.g. `info` or `vidlsh=debug,candidates=trace`.
    #[arg(long, global = true, env = "VIDLSH_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Read video records, write one `(band,bucket)` record per band.
    Map {
        #[command(flatten)]
        job: JobArgs,
        #[command(flatten)]
        files: IoArgs,
    },
    /// Read key-sorted mapper records, write similar pairs.
    Reduce {
        #[command(flatten)]
        job: JobArgs,
        #[command(flatten)]
        files: IoArgs,
    },
    /// Map, shuffle and reduce in one process.
    Run {
        #[command(flatten)]
        job: JobArgs,
        #[command(flatten)]
        files: IoArgs,
        /// Run mapper tasks on the current thread only.
        #[arg(long)]
        sequential: bool,
        /// Write mapper output to this file.
        #[arg(long)]
        store_map: Option<PathBuf>,
        /// Write the key-sorted reducer input to this file.
        #[arg(long)]
        store_sort: Option<PathBuf>,
        /// Write the reported pairs to this file as well.
        #[arg(long)]
        store_reduce: Option<PathBuf>,
    },
    /// Score a pairs file against a ground-truth pairs file.
    Eval {
        #[arg(long)]
        predicted: PathBuf,
        #[arg(long)]
        truth: PathBuf,
    },
}

/// Job configuration: an optional YAML file plus flag overrides.
#[derive(Args)]
struct JobArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    bands: Option<usize>,
    #[arg(long)]
    rows: Option<usize>,
    #[arg(long)]
    threshold: Option<f64>,
}

impl JobArgs {
    fn resolve(&self) -> Result<JobConfig> {
        let mut job = match &self.config {
            Some(path) => JobConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => JobConfig::default(),
        };
        if let Some(seed) = self.seed {
            job.lsh.seed = seed;
        }
        if let Some(bands) = self.bands {
            job.lsh.bands = bands;
            job.lsh.hashes = None;
        }
        if let Some(rows) = self.rows {
            job.lsh.rows = rows;
        }
        if let Some(threshold) = self.threshold {
            job.lsh.threshold = threshold;
        }
        job.validate().context("invalid job configuration")?;
        Ok(job)
    }
}

#[derive(Args)]
struct IoArgs {
    /// Read from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Write to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl IoArgs {
    fn open_input(&self) -> Result<Box<dyn BufRead>> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("opening {}", path.display()))?,
            )),
            None => Box::new(io::stdin().lock()),
        })
    }

    fn open_output(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }
}

fn init_tracing(level: Option<&str>, json: bool) -> Result<()> {
    let level = level.unwrap_or("info");
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log filter {level:?}"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.log_json)?;

    match cli.command {
        Command::Map { job, files } => {
            let job = job.resolve()?;
            let mapper = Mapper::new(&job.lsh_config()?)?;
            let summary = map_stream(&mapper, files.open_input()?, files.open_output()?)?;
            tracing::info!(
                records = summary.records,
                skipped = summary.skipped,
                emissions = summary.emissions,
                "map finished"
            );
        }
        Command::Reduce { job, files } => {
            let job = job.resolve()?;
            let summary = reduce_stream(
                &job.lsh_config()?,
                job.candidates,
                files.open_input()?,
                files.open_output()?,
            )?;
            tracing::info!(
                records = summary.records,
                skipped = summary.skipped,
                groups = summary.stats.groups,
                pairs = summary.stats.pairs,
                "reduce finished"
            );
        }
        Command::Run {
            job,
            files,
            sequential,
            store_map,
            store_sort,
            store_reduce,
        } => {
            let job = job.resolve()?;
            let mut options = LocalOptions::from(&job.local);
            options.parallel &= !sequential;
            options.store_map = store_map.or(options.store_map);
            options.store_sort = store_sort.or(options.store_sort);
            options.store_reduce = store_reduce.or(options.store_reduce);

            let (pairs, summary) = run_local_lines(
                &job.lsh_config()?,
                job.candidates,
                files.open_input()?,
                &options,
            )?;
            write_pairs(&files, &pairs)?;
            tracing::info!(
                summary = %serde_json::to_string(&summary)?,
                "run finished"
            );
        }
        Command::Eval { predicted, truth } => {
            let report = evaluate_files(&predicted, &truth)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn write_pairs(files: &IoArgs, pairs: &[SimilarPair]) -> Result<()> {
    let mut out = files.open_output()?;
    for pair in pairs {
        writeln!(out, "{}", format_pair(*pair)).context("writing pairs")?;
    }
    out.flush().context("writing pairs")?;
    Ok(())
}
