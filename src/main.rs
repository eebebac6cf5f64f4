use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use hitl_graph::parity;
use hitl_graph::workflow::loader::GraphLoader;
use hitl_graph::{Engine, EngineConfig, Halt, InMemoryCheckpointStore, RunInput, StateUpdate};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict the parity of a number and ask a human to review it
    Parity {
        /// The number to classify
        #[arg(short, long)]
        number: i64,

        /// Thread id for the run
        #[arg(short, long, default_value = "cli")]
        thread: String,

        /// Review decision ("confirm" or "reject"); prompts when absent
        #[arg(short, long)]
        feedback: Option<String>,
    },
    /// Validate a graph file against the built-in parity nodes
    Check {
        /// Path to the graph file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Parity {
            number,
            thread,
            feedback,
        } => {
            let config = EngineConfig::from_env()?;
            let engine = Engine::with_config(
                Arc::new(parity::graph()?),
                Arc::new(InMemoryCheckpointStore::new()),
                config,
            );

            let mut input = StateUpdate::new();
            input.insert("number".to_string(), json!(number));
            let outcome = engine.run(&thread, RunInput::Initial(input)).await?;

            let prediction = outcome.snapshot.get_str("prediction").unwrap_or("unknown");
            println!("Prediction for {}: {}", number, prediction);

            if outcome.halted_at != Halt::Interrupted(parity::HUMAN_REVIEW.to_string()) {
                bail!("expected to pause for review, got {:?}", outcome.halted_at);
            }

            let feedback = match feedback {
                Some(feedback) => parity::normalize_feedback(&feedback),
                None => parity::normalize_feedback(&prompt(
                    "Confirm or reject? [confirm/reject]: ",
                )?),
            };
            if feedback != parity::CONFIRM && feedback != "reject" {
                log::warn!("Unrecognized feedback '{}', treating as reject", feedback);
            }

            let mut review = StateUpdate::new();
            review.insert("human_feedback".to_string(), json!(feedback));
            engine.update_state(&thread, review).await?;

            let outcome = engine.run(&thread, RunInput::Resume).await?;
            let result = outcome.snapshot.get_str("final_result").unwrap_or("Done");
            println!("Result: {}", result);
        }
        Commands::Check { file } => {
            let config = GraphLoader::new()
                .load(&file)
                .with_context(|| format!("failed to load {}", file))?;
            let graph = config.into_graph(&parity::registry().await?).await?;

            println!("Graph '{}' is valid", graph.name());
            println!("  entry: {}", graph.entry());
            println!("  nodes: {}", graph.node_names().join(", "));
            println!("  interrupt before: {}", graph.interrupt_nodes().join(", "));
        }
    }

    Ok(())
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
