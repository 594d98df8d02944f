use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use env_logger::Env;
use log::info;

use rs_chain_core::config::{ChainConfig, SnapshotFormat, TrainingUnit};
use rs_chain_core::model::table::TransitionTable;
use rs_chain_core::store;

/// How a corpus is cut into sequences, as accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Unit {
    Line,
    Document,
}

impl From<Unit> for TrainingUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Line => TrainingUnit::Line,
            Unit::Document => TrainingUnit::Document,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rs-chain", about = "Generate text from a word Markov chain")]
#[command(group(ArgGroup::new("source").required(true).args(["corpus", "snapshot"])))]
struct Cli {
    /// Text file to train from. Its snapshot is cached next to it.
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Snapshot file (.json or .bin) to load instead of training.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Words generated after the first one.
    #[arg(long)]
    length: Option<usize>,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Train on each line, or on the whole file as one sequence.
    #[arg(long, value_enum)]
    unit: Option<Unit>,

    /// Write the loaded chain to this snapshot (.json or .bin).
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print the transition table before generating.
    #[arg(long)]
    print_table: bool,
}

impl Cli {
    /// Config file values, overridden by command line flags.
    fn config(&self) -> anyhow::Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::from_file(path)
                .with_context(|| format!("cannot read config {}", path.display()))?,
            None => ChainConfig::default(),
        };
        if let Some(length) = self.length {
            config.length = length;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(unit) = self.unit {
            config.unit = unit.into();
        }
        Ok(config)
    }

    fn load_table(&self, config: &ChainConfig) -> anyhow::Result<TransitionTable> {
        if let Some(path) = &self.snapshot {
            return store::load(path).with_context(|| format!("cannot load snapshot {}", path.display()));
        }
        let corpus = self.corpus.as_ref().context("either --corpus or --snapshot is required")?;
        store::load_or_train(corpus, config.unit, config.snapshot)
            .with_context(|| format!("cannot train from {}", corpus.display()))
    }
}

fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level)).try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    init_logging(&config.log_level);

    let table = cli.load_table(&config)?;
    info!("chain ready: {} words, {} transitions", table.len(), table.transition_count());

    if let Some(path) = &cli.save {
        store::save(&table, path, SnapshotFormat::from_path(path))
            .with_context(|| format!("cannot save snapshot {}", path.display()))?;
    }

    if cli.print_table {
        print!("{table}");
    }

    // One text per Enter, until end of input or 'q'
    let mut rng = config.rng();
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        let words = table.generate(config.length, &mut rng)?;
        println!("{}", words.join(" "));
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim() == "q" {
            break;
        }
    }

    Ok(())
}
