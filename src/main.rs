use clap::Parser;
use unfurl_relay::{Relay, ResponseMode};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    // File first, then environment, then command line
    let mut relay = Relay::new();
    if let Some(path) = &args.config {
        relay = match relay.with_config_file(path) {
            Ok(relay) => relay,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        };
    }
    relay = relay.with_env();

    if let Some(bind) = args.bind {
        relay = relay.with_bind_addr(bind);
    }
    if let Some(url) = args.webdriver_url {
        relay = relay.with_webdriver(url);
    }
    if let Some(url) = args.webhook_url {
        relay = relay.with_webhook(url);
    }
    if args.buffered {
        relay = relay.with_response_mode(ResponseMode::Buffered);
    }

    let config = relay.config();
    match &config.webdriver_url {
        Some(url) => ::log::info!("Rendering through WebDriver at {}", url),
        None => ::log::info!("No WebDriver configured, using direct fetch only"),
    }
    if config.webhook_url.is_none() {
        ::log::info!("No webhook configured, notifications disabled");
    }

    if let Err(e) = relay.serve().await {
        ::log::error!("Relay stopped: {}", e);
        std::process::exit(1);
    }
}
