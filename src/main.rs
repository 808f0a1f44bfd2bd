use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tavola::cli::{Cli, Commands};
use tavola::{build_system, utils, Settings, System, TurnRequest};
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new().unwrap_or_default();
    // RUST_LOG wins; the configured level is the fallback.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
        )
        .init();
    let api_key = Settings::api_key().ok();
    if api_key.is_none() {
        utils::print_info("OPENAI_API_KEY not set; running with the offline embedder");
    }
    let system = build_system(&settings, api_key);

    let cli = Cli::parse();
    match cli.command {
        Commands::Chat {
            message,
            session_id,
            chat_id,
            smart_recall,
        } => handle_chat(&system, message, session_id, chat_id, smart_recall).await,
        Commands::Interactive {
            session_id,
            smart_recall,
        } => handle_interactive(&system, session_id, smart_recall).await,
        Commands::Load { file } => handle_load(&system, &file).await,
        Commands::Sessions => handle_sessions(&system).await,
    }
}

async fn handle_chat(
    system: &System,
    message: String,
    session_id: String,
    chat_id: String,
    smart_recall: bool,
) -> Result<()> {
    let response = system
        .orchestrator
        .handle_turn(TurnRequest {
            session_id,
            chat_id,
            message,
            use_smart_recall: smart_recall,
        })
        .await?;

    println!("\n{}", response.content);
    if response.is_cached_response {
        utils::print_cache_note("(cached)");
    }
    Ok(())
}

async fn handle_interactive(system: &System, session_id: String, smart_recall: bool) -> Result<()> {
    utils::print_header("Tavola Interactive");
    utils::print_info("Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin).lines();

    loop {
        utils::print_prompt("you> ");
        std::io::stdout().flush()?;

        let line = match reader.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let message = line.trim().to_string();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") {
            break;
        }

        match system
            .orchestrator
            .handle_turn(TurnRequest {
                session_id: session_id.clone(),
                chat_id: "main".to_string(),
                message,
                use_smart_recall: smart_recall,
            })
            .await
        {
            Ok(response) => {
                println!("{}", response.content);
                utils::print_cache_note(&format!(
                    "[cache: {:?}, tools: {}]",
                    response.state.cache_status,
                    if response.state.tools_used.is_empty() {
                        "none".to_string()
                    } else {
                        response.state.tools_used.join(", ")
                    }
                ));
            }
            Err(e) => utils::print_error(&format!("Error: {}", e)),
        }
    }

    utils::print_success("Goodbye!");
    Ok(())
}

async fn handle_load(system: &System, file: &str) -> Result<()> {
    utils::print_info(&format!("Loading restaurants from {}...", file));
    let loaded = tavola::loader::load_restaurants(
        Path::new(file),
        system.index.clone(),
        system.embedder.clone(),
    )
    .await?;
    utils::print_success(&format!("Loaded {} restaurants", loaded));
    Ok(())
}

async fn handle_sessions(system: &System) -> Result<()> {
    use tavola::domain::session::SessionStore;

    let sessions = system.sessions.list_sessions().await?;
    if sessions.is_empty() {
        utils::print_info("No sessions yet");
    } else {
        for session in sessions {
            println!("{}", session);
        }
    }
    Ok(())
}
