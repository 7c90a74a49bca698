use clap::{Arg, ArgMatches, Command};
use std::env;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod mcp;
mod session;
mod tools;
mod utils;

use mcp::server::McpServer;
use mcp::transport::StdioTransport;
use utils::gemini::{GeminiConfig, DEFAULT_API_BASE, DEFAULT_MODEL};

fn build_cli() -> Command {
    Command::new("mcp-pdfask")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A Model Context Protocol server for asking questions about a PDF")
        .long_about(
            "This MCP server provides the following tools:\n\
            - load-pdf: Load a PDF from a path or URL and extract its text\n\
            - ask-question: Ask Google Gemini a question about the loaded PDF\n\
            - save-answer: Keep the latest answer for this session\n\
            - list-answers: Show the saved question/answer pairs\n\
            - clear-answers: Remove all saved answers\n\
            - export-answers: Export the saved answers as a PDF",
        )
        .arg(
            Arg::new("google-api-key")
                .long("google-api-key")
                .value_name("KEY")
                .help("Google Gemini API key (defaults to GOOGLE_API_KEY)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help("Gemini model identifier (defaults to GEMINI_MODEL or gemini-1.5-flash)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .value_name("URL")
                .help("Base URL of the Gemini API (defaults to GEMINI_API_BASE)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors (for MCP clients that surface stderr)")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Resolves a setting from the command line first, then the environment.
fn flag_or_env(matches: &ArgMatches, flag: &str, var: &str) -> Option<String> {
    matches
        .get_one::<String>(flag)
        .cloned()
        .or_else(|| env::var(var).ok())
        .filter(|value| !value.trim().is_empty())
}

fn resolve_gemini_config(matches: &ArgMatches) -> Option<GeminiConfig> {
    let api_key = flag_or_env(matches, "google-api-key", "GOOGLE_API_KEY")?;
    let model = flag_or_env(matches, "model", "GEMINI_MODEL")
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let api_base = flag_or_env(matches, "api-base", "GEMINI_API_BASE")
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    Some(GeminiConfig {
        api_key,
        model,
        api_base,
    })
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    // Logs go to stderr only (stdout is reserved for JSON-RPC)
    let filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches.get_flag("quiet") {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let gemini_config = match resolve_gemini_config(&matches) {
        Some(config) => config,
        None => {
            error!("Google Gemini API key not found in environment variables.");
            error!("Please set the 'GOOGLE_API_KEY' environment variable (or pass --google-api-key).");
            process::exit(1);
        }
    };

    info!(
        model = %gemini_config.model,
        api_base = %gemini_config.api_base,
        "Gemini answer service configured"
    );

    info!("Starting MCP server...");

    let mut server = McpServer::new(gemini_config);
    if let Err(e) = server.start(StdioTransport::stdio()).await {
        error!("Failed to start server: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_take_precedence_and_defaults_apply() {
        let matches = build_cli().get_matches_from([
            "mcp-pdfask",
            "--google-api-key",
            "from-flag",
            "--api-base",
            "http://localhost:1234",
        ]);

        let config = resolve_gemini_config(&matches).expect("config");
        assert_eq!(config.api_key, "from-flag");
        assert_eq!(config.api_base, "http://localhost:1234");
        if env::var("GEMINI_MODEL").is_err() {
            assert_eq!(config.model, DEFAULT_MODEL);
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }
}
