use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use wingman::chatbot::openai::Client as OpenAiClient;
use wingman::chatbot::{Dialog, Resources, TelegramClient};
use wingman::config::Config;
use wingman::server::{create_router, AppState};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wingman.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("wingman.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting wingman...");
    info!("Loaded config from {config_path}");

    let bot = Bot::new(&config.telegram_bot_token);

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            warn!("Failed to get bot info: {e}");
            String::new()
        }
    };

    if let Some(ref url) = config.webhook_url {
        match reqwest::Url::parse(url) {
            Ok(url) => match bot.set_webhook(url).await {
                Ok(_) => info!("Webhook registered"),
                Err(e) => warn!("Failed to register webhook: {e}"),
            },
            Err(e) => warn!("Invalid webhook_url {url:?}: {e}"),
        }
    }

    let resources = Resources::new(config.resources_dir.clone());
    info!("Resources from {:?}", resources.root());

    let model = Arc::new(OpenAiClient::new(config.openai_api_key.clone(), &config.openai_base_url));
    let telegram = Arc::new(TelegramClient::new(bot));
    let dialog = Dialog::new(resources, model, telegram, bot_username);

    let state = AppState {
        dialog: Arc::new(dialog),
    };
    let app = create_router(state, &config.webhook_path);

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {e}", config.listen_addr);
            std::process::exit(1);
        }
    };
    info!("Listening on {} (webhook at {})", config.listen_addr, config.webhook_path);

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down");
    };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        error!("Server error: {e}");
    }
}
