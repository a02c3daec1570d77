use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, MessageId, ParseMode};
use teloxide::RequestError;
use tracing::{error, info, warn};

use crate::browser::Tab;
use crate::handlers::commands::{request_location, send_share_links, send_weekly_plan};
use crate::handlers::keyboards::CallbackAction;
use crate::handlers::photo::render_tab;
use crate::handlers::responses::{
    edit_html_with_retry, failure_text, try_on_caption, STALE_SELECTION_TEXT,
};
use crate::state::AppState;
use crate::stylist::session::{request_try_on, RequestToken, TryOnOutcome};
use crate::stylist::RecommendationField;
use crate::utils::telegram::start_chat_action_heartbeat;
use crate::utils::timing::{complete_command_timer, start_callback_timer};

pub async fn callback_handler(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let Some(action) = query.data.as_deref().and_then(CallbackAction::parse) else {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };
    let chat = message.chat().clone();
    let message_id = message.id();

    match action {
        CallbackAction::Tab { generation, tab } => {
            let token = RequestToken {
                chat_id: chat.id.0,
                generation,
            };
            switch_tab(&bot, &state, &query, token, tab, message_id).await
        }
        CallbackAction::TryOn {
            generation,
            field,
            index,
        } => {
            bot.answer_callback_query(query.id.clone())
                .text("Trying it on…")
                .await?;
            let token = RequestToken {
                chat_id: chat.id.0,
                generation,
            };
            try_on(&bot, &state, &query, token, field, index).await;
            Ok(())
        }
        CallbackAction::Plan { generation } => {
            if !is_current(&state, chat.id, generation) {
                return answer_stale(&bot, &query).await;
            }
            bot.answer_callback_query(query.id.clone())
                .text("Planning your week…")
                .await?;
            let mut timer = start_callback_timer("plan", &query);
            let status = send_weekly_plan(&bot, &state, chat.id).await;
            complete_command_timer(&mut timer, status, None);
            Ok(())
        }
        CallbackAction::Nearby { generation } => {
            if !is_current(&state, chat.id, generation) {
                return answer_stale(&bot, &query).await;
            }
            bot.answer_callback_query(query.id.clone()).await?;
            request_location(&bot, &state, &chat).await
        }
        CallbackAction::Share => {
            bot.answer_callback_query(query.id.clone()).await?;
            send_share_links(&bot, &state, chat.id).await
        }
    }
}

fn is_current(state: &AppState, chat_id: ChatId, generation: u64) -> bool {
    state.sessions.is_current(RequestToken {
        chat_id: chat_id.0,
        generation,
    })
}

async fn answer_stale(bot: &Bot, query: &CallbackQuery) -> Result<()> {
    bot.answer_callback_query(query.id.clone())
        .text(STALE_SELECTION_TEXT)
        .show_alert(true)
        .await?;
    Ok(())
}

async fn switch_tab(
    bot: &Bot,
    state: &AppState,
    query: &CallbackQuery,
    token: RequestToken,
    tab: Tab,
    message_id: MessageId,
) -> Result<()> {
    let Some((analysis, previous)) = state.sessions.set_active_tab(token, tab) else {
        return answer_stale(bot, query).await;
    };
    bot.answer_callback_query(query.id.clone()).await?;
    if previous == tab {
        return Ok(());
    }
    let (text, keyboard) = render_tab(state, &analysis, tab, token.generation);
    edit_html_with_retry(
        bot,
        ChatId(token.chat_id),
        message_id,
        &text,
        Some(keyboard),
    )
    .await
}

async fn try_on(
    bot: &Bot,
    state: &AppState,
    query: &CallbackQuery,
    token: RequestToken,
    field: RecommendationField,
    index: usize,
) {
    let mut timer = start_callback_timer("try_on", query);
    let chat_id = ChatId(token.chat_id);

    let outcome = {
        let _chat_action =
            start_chat_action_heartbeat(bot.clone(), chat_id, ChatAction::UploadPhoto);
        request_try_on(state.stylist.as_ref(), &state.sessions, token, field, index).await
    };

    let result = match outcome {
        Ok(TryOnOutcome::Edited {
            item,
            category,
            image,
        }) => match image.decode() {
            Ok(bytes) => {
                info!(
                    "Try-on ready for chat {}: {} ({} bytes)",
                    chat_id.0,
                    item,
                    bytes.len()
                );
                complete_command_timer(&mut timer, "success", None);
                let file_name = format!("try-on.{}", image.file_extension());
                bot.send_photo(chat_id, InputFile::memory(bytes).file_name(file_name))
                    .caption(try_on_caption(&item, category))
                    .parse_mode(ParseMode::Html)
                    .await
                    .map(|_| ())
            }
            Err(err) => {
                complete_command_timer(&mut timer, "error", Some(err.to_string()));
                send_failure(bot, chat_id, &failure_text("try-on", &err)).await
            }
        },
        Ok(TryOnOutcome::Superseded) => {
            complete_command_timer(&mut timer, "superseded", None);
            send_failure(bot, chat_id, STALE_SELECTION_TEXT).await
        }
        Err(err) => {
            error!("Try-on failed for chat {}: {}", chat_id.0, err);
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
            send_failure(bot, chat_id, &failure_text("try-on", &err)).await
        }
    };

    if let Err(err) = result {
        warn!("Failed to deliver try-on result to chat {}: {}", chat_id.0, err);
    }
}

async fn send_failure(bot: &Bot, chat_id: ChatId, text: &str) -> Result<(), RequestError> {
    bot.send_message(chat_id, text).await.map(|_| ())
}
