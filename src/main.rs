use brandmorpher::compose::TextRenderer;
use brandmorpher::config::{AppConfig, setup_logging};
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = brandmorpher::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = AppConfig::from(&cli);
    let text = TextRenderer::load(config.font_path.as_deref());

    if let Err(err) = tokio::fs::create_dir_all(&config.runs_dir).await {
        error!(
            "Failed to create runs directory {}: {}",
            config.runs_dir.display(),
            err
        );
        return;
    }

    if let Err(err) = brandmorpher::web::setup_server(config, text).await {
        error!("Application error: {}", err);
    }
}
