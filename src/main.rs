use anyhow::{Context, Result};
use care_assistant::{
    chat,
    config::{self, AgentConfig},
    web_server::{self, WebConfig},
    Agent,
};
use clap::{Args, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    agent: AgentArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug)]
struct AgentArgs {
    /// API key for the chat completions endpoint.
    #[arg(long, global = true, env = config::API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, default_value = config::DEFAULT_MODEL, help = "Model identifier.")]
    model: String,

    #[arg(long, global = true, default_value = config::DEFAULT_BASE_URL, help = "OpenAI-compatible base URL.")]
    base_url: String,

    #[arg(long, global = true, default_value = config::DEFAULT_DOCS_DIR, help = "Knowledge folder the read_file tool reads.")]
    docs_dir: PathBuf,

    #[arg(long, global = true, default_value_t = config::DEFAULT_MAX_TURNS, help = "Model turns allowed per answer.")]
    max_turns: usize,

    #[arg(long, global = true, help = "Send earlier turns of the conversation with each question.")]
    with_history: bool,
}

impl AgentArgs {
    fn into_config(self) -> Result<AgentConfig> {
        let config = AgentConfig::new(self.api_key)?
            .with_model(self.model)
            .with_base_url(self.base_url)
            .with_docs_dir(self.docs_dir)
            .with_max_turns(self.max_turns)?
            .with_thread_history(self.with_history);
        Ok(config)
    }
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chat web page.
    Serve {
        #[arg(long, default_value_t = 8501, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding index.html.")]
        templates_dir: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
    },
    /// Chat with the assistant in the terminal.
    Chat {
        #[arg(long, help = "Print the answer as it is generated.")]
        stream: bool,
    },
    /// Ask a single question and print the answer.
    Ask {
        question: String,
        #[arg(long, help = "Use a streamed request.")]
        stream: bool,
    },
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,care_assistant=debug).
    // Logs go to stderr so answers printed by `ask` stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    info!("Care assistant starting with command: {:?}", cli.command);

    let config = cli
        .agent
        .into_config()
        .context("Failed to initialize agent")?;
    let agent = Arc::new(Agent::new(config));

    match cli.command {
        Commands::Serve {
            port,
            templates_dir,
            static_dir,
        } => {
            info!("Starting web server on port {}...", port);
            let web_config = WebConfig {
                port,
                templates_dir,
                static_dir,
            };
            let mut web_server_handle = tokio::spawn(web_server::start_web_server(agent, web_config));

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                // Wait for Ctrl-C signal for graceful shutdown
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                    web_server_handle.abort();
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => info!("Web server task completed."),
                        Ok(Err(e)) => {
                            error!("Web server failed: {:?}", e);
                            return Err(e);
                        }
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { stream } => {
            info!("Starting interactive chat session...");
            chat::run_terminal_chat(&agent, stream)
                .await
                .context("Chat session failed")?;
        }
        Commands::Ask { question, stream } => {
            let result = chat::ask(&agent, &[], &question, stream).await;
            match result {
                Ok(answer) => println!("{}", answer),
                Err(e) => {
                    error!("Answer retrieval failed: {}", e);
                    println!("{}", chat::apology(&e));
                }
            }
        }
    }

    Ok(())
}
