use std::io::Write;

use anyhow::{Context, Result};
use askdocs_core::{AskClient, Config, ConfigOverrides, Endpoint, DEFAULT_PROMPTS, KNOWN_SOURCES};
use clap::{Parser, Subcommand};
use colored::*;
use futures_util::StreamExt;
use tracing::{error, info};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "askdocs", version)]
#[command(about = "Ask questions about your documents and watch the answer stream in")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the ask API (overrides ASKDOCS_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Answer route to post to: ask or ask-stream
    #[arg(long, global = true)]
    endpoint: Option<Endpoint>,

    /// Sampling temperature forwarded to the API (0.0 - 2.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Increase logging verbosity
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask one question and stream the answer to stdout
    Ask {
        /// Your question
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// List the suggested prompts
    Prompts,
    /// List the documents the assistant answers from
    Sources,
    /// Check that the API is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = Config::get_config_dir()?;
    let _log_guard = logging::setup_logging(&config_dir, cli.verbose)
        .context("failed to initialize logging")?;

    let config = resolve_config(&cli)?;
    let client = AskClient::from_config(&config);
    info!(url = %client.ask_url(), "starting");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_tui(config, client).await?,
        Commands::Ask { question } => ask_once(&client, &question.join(" ")).await?,
        Commands::Prompts => list_prompts(),
        Commands::Sources => list_sources(&config),
        Commands::Health => check_health(&client).await?,
    }

    Ok(())
}

/// Config file, then `ASKDOCS_API_URL`, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<Config> {
    Config::load_with(&ConfigOverrides {
        api_url: cli.api_url.clone(),
        endpoint: cli.endpoint,
        temperature: cli.temperature,
    })
}

async fn run_tui(config: Config, client: AskClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let config_path = Config::get_config_path().ok();
    let mut app = App::new(config, config_path, client, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "chat loop failed");
    }
    result
}

async fn ask_once(client: &AskClient, question: &str) -> Result<()> {
    println!("{} {}\n", "You:".bold().cyan(), question.trim());
    print!("{} ", "AI:".bold().yellow());
    std::io::stdout().flush()?;

    let mut deltas = match client.ask_stream(question).await {
        Ok(deltas) => deltas,
        Err(err) => {
            println!();
            return Err(err).with_context(|| {
                format!("could not get an answer from {}", client.base_url())
            });
        }
    };

    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(delta) => {
                print!("{}", delta);
                std::io::stdout().flush()?;
            }
            Err(err) => {
                println!();
                return Err(err).context("answer stream failed");
            }
        }
    }
    println!();

    Ok(())
}

fn list_prompts() {
    println!("\n{}", "Ask me anything".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    for prompt in DEFAULT_PROMPTS.iter() {
        let category = prompt.category.unwrap_or("General");
        println!("\n{} {}", format!("[{}]", category).dimmed(), prompt.title.bold().green());
        println!("  {}", prompt.prompt);
    }
}

fn list_sources(config: &Config) {
    println!("\n{}", "Available Sources".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    for source in KNOWN_SOURCES.iter() {
        println!("  • {}", source.name.green());
        println!("    {}", source.url(&config.files_url).dimmed());
    }
}

async fn check_health(client: &AskClient) -> Result<()> {
    match client.health().await {
        Ok(health) if health.is_ok() => {
            println!("{} {}", "API is up:".green().bold(), client.base_url());
            if let Some(index) = health.faiss_index {
                println!("  index: {}", index);
            }
        }
        Ok(health) => {
            println!("{} status '{}'", "API reachable but unhealthy:".yellow().bold(), health.status);
        }
        Err(err) => {
            println!("{}: {}", "Error connecting to API".red(), err);
            println!("Check the URL with: {}", "askdocs --api-url <url> health".bold());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ask_once_fails_on_http_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ask")
            .with_status(503)
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let err = ask_once(&client, "Is the API up?").await.unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP error! status: 503"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ask_once_fails_on_stream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/ask")
            .with_status(200)
            .with_body("data: {\"content\": \"Part\"}\n\ndata: {\"error\": \"index missing\"}\n\n")
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let err = ask_once(&client, "question").await.unwrap_err();
        assert!(format!("{:#}", err).contains("index missing"));
    }

    #[tokio::test]
    async fn test_ask_once_succeeds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/ask")
            .with_status(200)
            .with_body("data: {\"content\": \"Yes\"}\n\ndata: [DONE]\n\n")
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        assert!(ask_once(&client, "question").await.is_ok());
    }
}
