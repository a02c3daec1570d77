use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{Chat, ChatAction, KeyboardRemove, ParseMode, ReplyParameters};
use tracing::{error, info};

use crate::browser::links::nearby_term;
use crate::browser::{Coordinates, LocationFix};
use crate::config::HELP_TEXT;
use crate::handlers::keyboards::{location_request_keyboard, LOCATION_DECLINE_TEXT};
use crate::handlers::responses::{failure_text, share_message, weekly_plan_html};
use crate::state::AppState;
use crate::stylist::session::{request_weekly_plan, PlanOutcome};
use crate::stylist::Gender;
use crate::utils::telegram::{escape_html, start_chat_action_heartbeat};
use crate::utils::timing::{complete_command_timer, start_command_timer};

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(
        message.chat.id,
        format!("Hi! I'm your virtual stylist.\n\n{HELP_TEXT}"),
    )
    .reply_parameters(ReplyParameters::new(message.id))
    .await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, HELP_TEXT)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

pub async fn reset_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    state.sessions.reset(message.chat.id.0);
    info!("Session reset for chat {}", message.chat.id.0);
    bot.send_message(
        message.chat.id,
        "Done. I've forgotten your photo and profile. Send a new photo whenever you like.",
    )
    .reply_markup(KeyboardRemove::new())
    .await?;
    Ok(())
}

pub async fn plan_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let mut timer = start_command_timer("plan", &message);
    let status = send_weekly_plan(&bot, &state, message.chat.id).await;
    complete_command_timer(&mut timer, status, None);
    Ok(())
}

/// Generates and sends the 7-day calendar for the chat's current profile.
/// Returns the timer status.
pub async fn send_weekly_plan(bot: &Bot, state: &AppState, chat_id: ChatId) -> &'static str {
    let outcome = {
        let _chat_action = start_chat_action_heartbeat(bot.clone(), chat_id, ChatAction::Typing);
        request_weekly_plan(state.stylist.as_ref(), &state.sessions, chat_id.0).await
    };

    let (text, status) = match outcome {
        Ok(PlanOutcome::Ready(plan)) => {
            let status = if plan.is_complete() { "success" } else { "partial" };
            (weekly_plan_html(&plan), status)
        }
        Ok(PlanOutcome::Superseded) => return "superseded",
        Err(err) => {
            error!("Weekly plan failed for chat {}: {}", chat_id.0, err);
            (escape_html(&failure_text("weekly plan", &err)), "error")
        }
    };

    if let Err(err) = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
    {
        error!("Failed to send weekly plan to chat {}: {}", chat_id.0, err);
        return "error";
    }
    status
}

pub async fn share_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    send_share_links(&bot, &state, message.chat.id).await
}

/// Telegram always has a share sheet (`t.me/share/url`).
const TELEGRAM_NATIVE_SHARE: bool = true;

pub async fn send_share_links(bot: &Bot, state: &AppState, chat_id: ChatId) -> Result<()> {
    let (text, keyboard) = share_message(&state.links, TELEGRAM_NATIVE_SHARE);
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn nearby_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    request_location(&bot, &state, &message.chat).await
}

/// Asks for the user's location. Chats that cannot share one get the
/// "near me" search straight away.
pub async fn request_location(bot: &Bot, state: &AppState, chat: &Chat) -> Result<()> {
    if !chat.is_private() {
        return send_nearby_link(bot, state, chat.id, LocationFix::Unsupported).await;
    }
    state.sessions.set_awaiting_location(chat.id.0, true);
    bot.send_message(
        chat.id,
        format!(
            "Share your location and I'll find a {} near you, or tap \"{}\".",
            nearby_term(current_gender(state, chat.id)),
            LOCATION_DECLINE_TEXT
        ),
    )
    .reply_markup(location_request_keyboard())
    .await?;
    Ok(())
}

fn current_gender(state: &AppState, chat_id: ChatId) -> Option<Gender> {
    state
        .sessions
        .snapshot(chat_id.0)
        .and_then(|session| session.analysis)
        .and_then(|analysis| analysis.profile.gender)
}

pub async fn send_nearby_link(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    fix: LocationFix,
) -> Result<()> {
    let gender = current_gender(state, chat_id);
    let url = state.links.nearby_url(gender, fix);
    info!("Nearby search for chat {}: {:?}", chat_id.0, fix);

    let intro = match fix {
        LocationFix::Position(_) => "Here's what's around you",
        LocationFix::Denied | LocationFix::Unsupported => "No location, so here's a search near you",
    };
    bot.send_message(
        chat_id,
        format!(
            "{intro}: <a href=\"{}\">{} on Maps</a>",
            escape_html(url.as_str()),
            escape_html(nearby_term(gender))
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(KeyboardRemove::new())
    .await?;
    Ok(())
}

pub async fn location_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(location) = message.location() else {
        return Ok(());
    };
    let coordinates = Coordinates {
        latitude: location.latitude,
        longitude: location.longitude,
    };
    state.sessions.take_awaiting_location(message.chat.id.0);
    send_nearby_link(
        &bot,
        &state,
        message.chat.id,
        LocationFix::Position(coordinates),
    )
    .await
}

/// Plain text: the location opt-out, otherwise a nudge towards sending a photo.
pub async fn text_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    if text.trim_start().starts_with('/') {
        return Ok(());
    }
    if state.sessions.take_awaiting_location(message.chat.id.0) {
        if text.trim() == LOCATION_DECLINE_TEXT {
            return send_nearby_link(&bot, &state, message.chat.id, LocationFix::Denied).await;
        }
        bot.send_message(message.chat.id, "No worries, maybe later.")
            .reply_markup(KeyboardRemove::new())
            .await?;
        return Ok(());
    }
    if message.chat.is_private() {
        bot.send_message(
            message.chat.id,
            "Send me a clear, front-facing photo to get your style profile.",
        )
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    }
    Ok(())
}
