mod chat;
mod config;
mod conversation;
mod converters;
mod error;
mod llm_client;
mod logging;
mod models;
mod relay_client;
mod request_id;
mod router;

use clap::{Parser, Subcommand};
use config::Config;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "chat-relay")]
#[command(about = "Relay chat transcripts to the Gemini API")]
struct Args {
    /// trace, debug, info, warn, error
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Also write logs to this file (rotated at 10 MiB)
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// socks and http proxy for outbound calls, example: socks5://192.168.0.2:10080
    #[arg(long, global = true)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay HTTP server
    Serve {
        #[arg(short, long, default_value = "0.0.0.0")]
        ip: String,

        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Path to an optional YAML config file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Chat in the terminal through a running relay
    Chat {
        #[arg(short, long, default_value = "http://127.0.0.1:8000/api/gemini-proxy")]
        url: String,
    },
}

fn build_http_client(proxy: Option<&str>) -> anyhow::Result<Arc<reqwest::Client>> {
    let client_builder = reqwest::Client::builder();
    let client_builder = match proxy {
        Some(proxy) => client_builder.proxy(reqwest::Proxy::all(proxy)?),
        None => client_builder,
    };
    Ok(Arc::new(client_builder.build()?))
}

async fn serve(ip: String, port: u16, config_path: Option<String>, http_client: Arc<reqwest::Client>) -> anyhow::Result<()> {
    let config = Config::load(config_path.as_deref())?;
    match &config_path {
        Some(path) => info!("Configuration loaded successfully from: {}", path),
        None => info!("No config file given, using defaults"),
    }
    if config.resolve_api_key().is_none() {
        // Not fatal at startup: every request re-reads the key
        tracing::warn!("{} is not set; relay calls will fail until it is", config.api_key_env);
    }

    let route = config.route.clone();
    let app_state = router::AppState {
        config: Arc::new(config),
        llm_client: Arc::new(llm_client::LlmClient::new(http_client)),
    };
    let app = router::app(app_state);

    let bind_address = format!("{}:{}", ip, port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Relay listening on http://{}{}", bind_address, route);

    axum::serve(listener, app).await?;
    Ok(())
}

fn console_for(command: Option<&Command>) -> logging::Console {
    match command {
        Some(Command::Chat { .. }) => logging::Console::Stderr,
        _ => logging::Console::Stdout,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using INFO level.", args.log_level);
        Level::INFO
    });
    logging::init_logging(log_level, args.log_file.as_deref(), console_for(args.command.as_ref()));

    let http_client = build_http_client(args.proxy.as_deref())?;

    match args.command.unwrap_or(Command::Serve { ip: "0.0.0.0".to_string(), port: 8000, config: None }) {
        Command::Serve { ip, port, config } => serve(ip, port, config, http_client).await,
        Command::Chat { url } => {
            let transport = relay_client::HttpRelayTransport::new(http_client, url);
            info!("Chatting through {}", transport.relay_url());
            chat::run_chat(&transport).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_logs_go_to_stderr() {
        let args = Args::parse_from(["chat-relay", "chat", "--url", "http://localhost:8000/api/gemini-proxy"]);
        assert_eq!(console_for(args.command.as_ref()), logging::Console::Stderr);
    }

    #[test]
    fn test_serve_logs_go_to_stdout() {
        let args = Args::parse_from(["chat-relay", "serve", "--port", "9000"]);
        assert_eq!(console_for(args.command.as_ref()), logging::Console::Stdout);
        let args = Args::parse_from(["chat-relay"]);
        assert_eq!(console_for(args.command.as_ref()), logging::Console::Stdout);
    }
}
