//! Command-line driver: ingests newline-delimited JSON documents (each a
//! JSON array of string tokens) through a [`particle_lda::ParticleFilterLDA`]
//! configured from a JSON file, then prints the resulting topic report.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use particle_lda::{new_engine, EngineConfig};

#[derive(Parser, Debug)]
#[clap(name = "lda-filter", about = "Online particle-filter LDA over a document stream")]
struct Args {
    /// Path to a JSON file holding an `EngineConfig`.
    #[clap(long)]
    config: PathBuf,

    /// Path to a newline-delimited JSON file; each line is a JSON array of
    /// string tokens for one document.
    #[clap(long)]
    documents: PathBuf,

    /// Number of top words to print per particle, per topic.
    #[clap(long, default_value_t = 10)]
    top_words: usize,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = File::open(&args.config)?;
    let config: EngineConfig = serde_json::from_reader(config_file)?;
    let mut engine = new_engine(config)?;

    let documents = File::open(&args.documents)?;
    for (line_no, line) in BufReader::new(documents).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<String> = serde_json::from_str(&line)
            .map_err(|e| format!("document on line {} is not a JSON string array: {e}", line_no + 1))?;
        tracing::info!(line = line_no + 1, tokens = tokens.len(), "ingesting document");
        engine.ingest_document(&tokens)?;
    }

    print!("{}", engine.topic_report(args.top_words));
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "lda-filter failed");
            ExitCode::FAILURE
        }
    }
}
