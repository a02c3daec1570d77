use std::error::Error;
use std::time::Duration;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod browser;
mod config;
mod handlers;
mod llm;
mod state;
mod stylist;
mod utils;

use browser::LinkSettings;
use config::CONFIG;
use handlers::{callbacks, commands, photo};
use llm::{GeminiClient, GeminiSettings};
use state::AppState;
use stylist::GeminiStylist;
use utils::http::build_http_client;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Help,
    Plan,
    Share,
    Nearby,
    Reset,
}

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging(&CONFIG.log_level);

    let http = build_http_client(Duration::from_secs(
        CONFIG.gemini_request_timeout_seconds.max(1),
    ))?;
    let client = GeminiClient::new(http.clone(), GeminiSettings::from_config(&CONFIG));
    let stylist = GeminiStylist::new(
        client,
        CONFIG.gemini_analysis_model.clone(),
        CONFIG.gemini_image_model.clone(),
    );
    let links = LinkSettings::from_config(&CONFIG)?;
    let state = AppState::new(
        stylist,
        links,
        http,
        &CONFIG.bot_token,
        CONFIG.max_photo_bytes,
        Duration::from_secs(CONFIG.session_ttl_seconds),
    );
    let _eviction = state.sessions.spawn_eviction(SESSION_SWEEP_INTERVAL);

    let bot = Bot::new(CONFIG.bot_token.clone());
    info!(
        "Starting virtual stylist bot (analysis={}, image={})",
        CONFIG.gemini_analysis_model,
        state.stylist.image_model()
    );

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| msg.photo().is_some() || msg.document().is_some())
                .endpoint(handle_photo),
        )
        .branch(dptree::filter(|msg: Message| msg.location().is_some()).endpoint(handle_location))
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .endpoint(ignore_message);

    let callback_state = state.clone();
    let callback_handler =
        Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
            let state = callback_state.clone();
            async move { handle_callback_query(bot, state, query).await }
        });

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, message).await?,
        Command::Help => commands::help_handler(bot, message).await?,
        Command::Reset => commands::reset_handler(bot, state, message).await?,
        Command::Share => commands::share_handler(bot, state, message).await?,
        Command::Nearby => commands::nearby_handler(bot, state, message).await?,
        Command::Plan => {
            tokio::spawn(async move {
                if let Err(err) = commands::plan_handler(bot, state, message).await {
                    error!("plan handler failed: {err}");
                }
            });
        }
    }
    Ok(())
}

async fn handle_photo(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = photo::photo_handler(bot, state, message).await {
            error!("photo handler failed: {err}");
        }
    });
    Ok(())
}

async fn handle_location(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    commands::location_handler(bot, state, message).await?;
    Ok(())
}

async fn handle_text(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    commands::text_handler(bot, state, message).await?;
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = callbacks::callback_handler(bot, state, query).await {
            error!("callback handler failed: {err}");
        }
    });
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
