use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::Level;
use xrayfit::config::Config;
use xrayfit::error::XfResult;
use xrayfit::store::DirectoryStore;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sample store directory (sample.json, scans.csv, measured/, simulated/).
    #[arg(global = true, short, long, default_value = "data")]
    store: String,

    /// JSON file with search settings; flags given on the command line win.
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the scans of the store.
    Scans(cmd::inspect::ScansArgs),
    /// List the layers of the sample.
    Layers(cmd::inspect::LayersArgs),
    /// Choose scans, fitting windows and parameters; writes a plan.
    Select(cmd::select::SelectArgs),
    /// Run a fit from a plan, or from the wizards when no plan is given.
    Fit(cmd::fit::FitArgs),
    /// Score a plan against the stored simulations.
    Score(cmd::score::ScoreArgs),
}

fn resolve_config(path: Option<&str>, cli: &Config, matches: Option<&ArgMatches>) -> XfResult<Config> {
    let Some(path) = path else {
        return Ok(cli.clone());
    };
    println!("⚖️  Loading search settings from: {}", path);
    let mut config = Config::load_from_file(path)?;
    if let Some(m) = matches {
        config.search.merge_from_cli(&cli.search, m);
    }
    Ok(config)
}

fn main() {
    // 1. Parse raw matches (to tell user input from defaults)
    let matches = Cli::command().get_matches();

    // 2. Construct CLI struct (populated with defaults)
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    println!("\n🚀 Initializing XrayFit...");
    println!("📂 Sample store: {}", cli.store);
    let store = DirectoryStore::new(&cli.store);

    // 3. Execute
    let result = match cli.command {
        Commands::Scans(args) => cmd::inspect::run_scans(args, &store),
        Commands::Layers(args) => cmd::inspect::run_layers(args, &store),
        Commands::Select(args) => cmd::select::run(args, &store),
        Commands::Fit(args) => {
            resolve_config(cli.config.as_deref(), &args.config, matches.subcommand_matches("fit"))
                .and_then(|config| cmd::fit::run(args, config, &store, cli.debug))
        }
        Commands::Score(args) => cmd::score::run(args, &cli.store),
    };

    if let Err(e) = result {
        eprintln!("\n❌ FATAL ERROR:");
        eprintln!("   {}", e);
        process::exit(1);
    }
}
