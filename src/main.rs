//! ontoloop CLI: adaptive rule-learning classification loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontoloop::backend::{CommandBackend, ExportFormat};
use ontoloop::compile::RuleCompiler;
use ontoloop::config::RunConfig;
use ontoloop::console::StdioChannel;
use ontoloop::generate::SituationGenerator;
use ontoloop::history::{HistoryView, SynonymMap};
use ontoloop::reason::RuleMatchReasoner;
use ontoloop::registry::RuleRegistry;
use ontoloop::session::Orchestrator;
use ontoloop::stats::RunStats;
use ontoloop::store::{CsvStore, KnowledgeStore};

#[derive(Parser)]
#[command(name = "ontoloop", version, about = "Adaptive rule-learning classification loop")]
struct Cli {
    /// Path to the run configuration TOML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive classification session over generated situations.
    Run {
        /// Number of situations to classify (overrides the config).
        #[arg(long)]
        situations: Option<usize>,

        /// Session RNG seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Situation generator seed (overrides the config).
        #[arg(long)]
        generator_seed: Option<u64>,

        /// Ask probability when reasoning fails (overrides the config).
        #[arg(long)]
        ask_rate: Option<f64>,
    },

    /// Compile a trainer export into rules and print them.
    Compile {
        /// Path to the exported tree file.
        #[arg(long)]
        export: PathBuf,

        /// Export format of the file.
        #[arg(long, value_enum, default_value = "tree-text")]
        format: ExportFormatArg,

        /// History CSV used to ground negated conditions.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Print a summary of a saved statistics file.
    Stats {
        /// Path to the statistics JSON (defaults to the configured one).
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ExportFormatArg {
    TreeText,
    PathJson,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::TreeText => ExportFormat::TreeText,
            ExportFormatArg::PathJson => ExportFormat::PathJson,
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    match cli.command {
        Commands::Run {
            situations,
            seed,
            generator_seed,
            ask_rate,
        } => run(
            config,
            situations,
            seed,
            generator_seed,
            ask_rate,
        ),

        Commands::Compile {
            export,
            format,
            history,
        } => compile(config, export, format.into(), history),

        Commands::Stats { file } => {
            let path = file.unwrap_or(config.results);
            let text = std::fs::read_to_string(&path).into_diagnostic()?;
            let stats = RunStats::from_json(&text).into_diagnostic()?;
            println!("{stats}");
            Ok(())
        }
    }
}

fn run(
    config: RunConfig,
    situations: Option<usize>,
    seed: Option<u64>,
    generator_seed: Option<u64>,
    ask_rate: Option<f64>,
) -> Result<()> {
    let situations = situations.unwrap_or(config.situations);
    let seed = seed.or(config.seed);
    let generator_seed = generator_seed.or(config.generator_seed);
    let ask_rate = ask_rate.unwrap_or(config.ask_rate);

    let mut store = CsvStore::load(&config.history)?.with_actions(config.extra_actions.clone());
    store.set_synonyms(SynonymMap::from_groups(config.synonyms.clone()));

    let registry = Arc::new(RuleRegistry::new());
    let reasoner = RuleMatchReasoner::new(registry.clone(), store.user_profiles());
    let backend = CommandBackend::new(
        config.trainer.command.clone(),
        config.trainer.args.clone(),
        config.trainer.format,
        config.trainer.work_dir.clone(),
    );
    let generator = SituationGenerator::from_history(&store.rows(), generator_seed);
    let channel = StdioChannel::new();

    let mut orchestrator = Orchestrator::new(
        store, backend, reasoner, channel, registry, ask_rate, seed,
    );

    println!("Welcome to the Reasoning And Learning System's Prototype!");
    for (i, situation) in generator.take(situations).enumerate() {
        println!("\nReceived a new observation ({} of {situations}):", i + 1);
        println!("{situation}");
        let action = orchestrator.classify(&situation)?;
        println!("Resolved action: {action}");
    }

    let (store, stats) = orchestrator.into_parts();
    store.save(&config.history)?;

    if let Some(parent) = config.results.parent() {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    std::fs::write(&config.results, stats.to_json().into_diagnostic()?).into_diagnostic()?;
    println!("\n{stats}");
    println!("Statistics saved to {}", config.results.display());
    Ok(())
}

fn compile(
    config: RunConfig,
    export: PathBuf,
    format: ExportFormat,
    history: Option<PathBuf>,
) -> Result<()> {
    let history_path = history.unwrap_or(config.history);
    let store = CsvStore::load(&history_path)?;
    let history = HistoryView::new(store.rows());

    let text = std::fs::read_to_string(&export).into_diagnostic()?;
    let records = match format {
        ExportFormat::TreeText => ontoloop::paths::parse_tree_text(&text)?,
        ExportFormat::PathJson => ontoloop::paths::parse_path_json(&text)?,
    };
    let rules = RuleCompiler::new(&history).compile(&records)?;

    println!("Compiled {} rules:", rules.len());
    for rule in &rules {
        println!("{rule}");
    }
    Ok(())
}
