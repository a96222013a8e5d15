//! brl: command-line Braille translation over liblouis.

mod commands;

use std::process;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "brl", version, about = "Braille translation with liblouis")]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter braille.toml in the current directory
    Init,
    /// Translate text to Braille (or back with --back)
    Translate {
        /// Text to translate
        text: String,
        /// Output representation (brf, unicode)
        #[arg(long)]
        mode: Option<String>,
        /// Use uncontracted (grade 1) Braille
        #[arg(long)]
        uncontracted: bool,
        /// Back-translate BRF or Unicode Braille to print
        #[arg(long)]
        back: bool,
    },
    /// Convert BRF to Unicode Braille (no engine required)
    Unicode {
        /// BRF text
        text: String,
        /// Convert Unicode Braille to BRF instead
        #[arg(long)]
        reverse: bool,
    },
    /// Manage the bundled translation tables
    Tables {
        #[command(subcommand)]
        action: TablesAction,
    },
    /// Check engine, table and configuration status
    Doctor {
        /// Report format (human, json)
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
enum TablesAction {
    /// Show which table assets are present in the source directory
    List {
        /// Asset directory (default: BRAILLE_TABLES, then braille.toml)
        #[arg(long)]
        from: Option<String>,
    },
    /// Write the table assets into engine storage
    Install {
        /// Asset directory (default: BRAILLE_TABLES, then braille.toml)
        #[arg(long)]
        from: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.parse_env("BRL_LOG");
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });
    builder.init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init => commands::init::run(&cwd),

        Commands::Translate {
            text,
            mode,
            uncontracted,
            back,
        } => {
            let (config, project_dir) = commands::load_config(&cwd)?;
            commands::translate::run(
                &project_dir,
                &config,
                &text,
                mode.as_deref(),
                uncontracted,
                back,
            )
        }

        Commands::Unicode { text, reverse } => {
            println!("{}", commands::unicode::convert(&text, reverse));
            Ok(())
        }

        Commands::Tables { action } => {
            let (config, project_dir) = commands::load_config(&cwd)?;
            match action {
                TablesAction::List { from } => {
                    commands::tables::list(&project_dir, &config, from.as_deref())
                }
                TablesAction::Install { from } => {
                    commands::tables::install(&project_dir, &config, from.as_deref())
                }
            }
        }

        Commands::Doctor { format } => commands::doctor::run(&cwd, format.as_deref()),
    }
}
