use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use decisionwise::{chat, constants, web_server, DecisionClient, DecisionError, OllamaModel};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Base URL of the Ollama server (defaults to $OLLAMA_URL).
    #[arg(long, global = true)]
    ollama_url: Option<String>,
    /// Model used for decisions (defaults to $DECISIONWISE_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the DecisionWise web server.
    Serve {
        #[arg(long, default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, help = "Directory served under /static.")]
        static_dir: Option<String>,
    },
    /// Let the model pick the best of the given options.
    Decide {
        #[arg(required = true, help = "The options to choose between.")]
        options: Vec<String>,
    },
    /// Summarize the given options.
    Summarize {
        #[arg(required = true, help = "The options to summarize.")]
        options: Vec<String>,
    },
    /// Interactive session: one comma separated list of options per line.
    Chat,
}

fn exit_with(err: DecisionError) -> ! {
    eprintln!("{}: {}", err.title(), err);
    std::process::exit(1);
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for OLLAMA_URL, DECISIONWISE_MODEL)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,decisionwise=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("DecisionWise starting with command: {:?}", cli.command);

    let model = OllamaModel::new(
        cli.ollama_url.unwrap_or_else(|| constants::OLLAMA_URL.clone()),
        cli.model.unwrap_or_else(|| constants::DECISION_MODEL.clone()),
    );
    let client = Arc::new(DecisionClient::new(Arc::new(model)));

    match cli.command {
        Commands::Serve { port, static_dir } => {
            info!("Starting DecisionWise on port {}...", port);
            let static_dir = static_dir.unwrap_or_else(|| constants::STATIC_DIR.clone());

            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, client, &static_dir).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Decide { options } => match client.decide(&options).await {
            Ok(result) => {
                println!("The best option is... {}", result.best_option);
                println!("{}", result.reasoning);
            }
            Err(err) => exit_with(err),
        },
        Commands::Summarize { options } => match client.summarize(&options).await {
            Ok(summary) => println!("{}", summary.summary),
            Err(err) => exit_with(err),
        },
        Commands::Chat => {
            chat::run_decision_chat(&client)
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
