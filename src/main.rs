use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use depot_recap::config::{self, AppConfig};
use depot_recap::export::PivotStore;
use depot_recap::extract::LocationTable;
use depot_recap::logging::{backend_info, backend_warn, init_logging};
use depot_recap::pipeline::{Pipeline, PipelineOutcome};
use depot_recap::server::{self, AppState};
use depot_recap::store::SqliteStore;

#[derive(Parser)]
#[command(name = "depot-recap", version)]
#[command(about = "Ask about container stock in plain language: pivot table + narrative recap")]
struct Cli {
    /// Config file (default: ./depot-recap.toml if present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        #[arg(long)] bind: Option<String>,
    },

    /// Ask a single question and print the pivot and narrative
    Ask {
        question: String,
        #[arg(long)] json: bool,
    },

    /// Show the normalized phrase for a question (no model, no database)
    Extract {
        text: String,
    },

    /// Create the inventory table in the configured SQLite file
    InitDb,
}

fn main() -> Result<()> {
    // Load environment variables from .env (cwd), if any
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(matches!(cli.command, Command::Serve { .. }));
    match dotenv {
        Ok(path) => backend_info(format!("Loaded .env from: {:?}", path)),
        Err(e) => backend_warn(format!("No .env loaded: {}", e)),
    }

    let cfg = config::load_config(cli.config.as_deref()).unwrap_or_else(|e| {
        backend_warn(format!("Config load failed ({}), using defaults", e));
        AppConfig::default()
    });

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            // Blocking HTTP clients must be built outside the async runtime
            let pipeline = Arc::new(Pipeline::from_config(&cfg).context("cannot set up LLM client")?);
            let pivots = Arc::new(PivotStore::new(cfg.export.max_sessions));
            let state = AppState::new(pipeline.clone(), pivots);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("cannot start tokio runtime")?;
            runtime.block_on(server::serve(state, &bind))?;
            drop(runtime);
            drop(pipeline);
        }

        Command::Ask { question, json } => {
            let pipeline = Pipeline::from_config(&cfg).context("cannot set up LLM client")?;
            let outcome = pipeline.run(&question)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
        }

        Command::Extract { text } => {
            let table = LocationTable::new(&cfg.locations);
            println!("{}", depot_recap::extract::preprocess_input(&table, &text));
        }

        Command::InitDb => {
            let store = SqliteStore::new(&cfg.database.path);
            store.init_schema(&cfg.database.table)?;
            println!("Table '{}' ready in {}", cfg.database.table, store.path());
        }
    }

    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Scalar { query, value } => {
            println!("\nSQL: {}\n", query);
            println!("Result: {}", value);
        }
        PipelineOutcome::Table(report) => {
            println!("\nSQL: {}\n", report.query);
            print!("{}", report.display.format_table());
            println!("\n── Recap ─────────────────────────────────────────");
            for line in &report.recap {
                println!("  {}", line);
            }
            println!("\n── Summary ───────────────────────────────────────");
            println!("{}", report.summary);
        }
    }
}
