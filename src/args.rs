use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "unfurl-relay")]
#[command(about = "Serves rich link previews to chat clients and redirects everyone else")]
#[command(version)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// WebDriver endpoint for headless rendering (overrides WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Webhook notified after each preview (overrides WEBHOOK_URL)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Wait for metadata and send previews in one piece instead of streaming
    #[arg(long, default_value_t = false)]
    pub buffered: bool,
}
