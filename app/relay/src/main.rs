use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use completion::CompletionService;
use completion::OpenAiCompletion;
use config::Config;
use config::Secrets;
use dispatcher::RequestDispatcher;
use display::DisplayController;
use gate::RequestGate;
use notifier::CompletionNotifier;
use openai::assistant::Assistant;
use openai::chat::Chat;
use platform::Messenger;
use platform::TelegramMessenger;
use secrecy::ExposeSecret;
use telegram::bot::Bot;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use worker::StreamWorker;

mod channel;
mod completion;
mod config;
mod dispatcher;
mod display;
mod gate;
mod notifier;
mod platform;
mod request;
#[cfg(test)]
mod testing;
mod worker;

#[derive(Parser)]
#[command(version, about = "relays chat messages to a streaming assistant", long_about = None)]
struct Cli {
    #[arg(long, help = "conf path")]
    conf: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?);

    // stdout belongs to the console display
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .with_line_number(true)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = Config::load(cli.conf.as_deref())?;
    let secrets = config.secrets()?;

    let bot = Arc::new(Bot::with_api_url(&config.telegram_api_url, secrets.telegram_token.expose_secret()));
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(Arc::clone(&bot)));
    let service: Arc<dyn CompletionService> = Arc::new(completion_service(&config, &secrets));

    let (message_tx, message_rx) = channel::unbounded();
    let (completion_tx, completion_rx) = channel::unbounded();
    let worker = StreamWorker::new(service, message_tx, completion_tx);
    let display = DisplayController::new(
        message_rx,
        display::surface_factory(&config.display),
        Duration::from_millis(config.display.poll_interval_ms),
    );

    let replies = Arc::new(config.replies.clone());
    let dispatcher = RequestDispatcher::new(
        RequestGate::new(),
        Arc::new(worker),
        Arc::new(display),
        Arc::clone(&messenger),
        Arc::clone(&replies),
    );

    let cancel = CancellationToken::new();
    let notifier = CompletionNotifier::new(completion_rx, messenger, replies.done.clone());
    let notifier = tokio::spawn(notifier.run(Duration::from_millis(config.notify_interval_ms), cancel.clone()));

    info!("relay started");
    tokio::select! {
        result = platform::poll_updates(bot.as_ref(), &dispatcher, config.polling_timeout_secs, platform::RETRY_DELAY) => result?,
        _ = framework::signal::shutdown_signal() => {},
    }

    info!("relay stopping, waiting for in-flight requests");
    framework::task::shutdown().await;
    cancel.cancel();
    notifier.await?;
    info!("relay stopped");

    Ok(())
}

fn completion_service(config: &Config, secrets: &Secrets) -> OpenAiCompletion {
    let api_key = secrets.openai_api_key.expose_secret().to_string();
    let assistant = Assistant::new(config.assistant_url.clone(), api_key.clone(), secrets.assistant_id.clone());

    let follow_up = &config.follow_up;
    let mut chat = Chat::new(config.chat_url.clone(), api_key, follow_up.model.clone());
    chat.config.system_message = Some(follow_up.instruction.clone());
    chat.config.temperature = Some(follow_up.temperature);
    chat.config.top_p = Some(follow_up.top_p);
    chat.config.max_tokens = Some(follow_up.max_tokens);

    OpenAiCompletion::new(assistant, chat)
}
