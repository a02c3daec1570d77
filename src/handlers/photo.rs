use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardMarkup, ParseMode, ReplyParameters};
use tracing::{error, info};

use crate::browser::{Tab, TabView};
use crate::handlers::keyboards::tab_keyboard;
use crate::handlers::media::{download_photo, photo_source};
use crate::handlers::responses::{edit_html_with_retry, failure_text, profile_summary_html};
use crate::state::AppState;
use crate::stylist::session::{analyze_photo, AnalysisOutcome};
use crate::stylist::ProfileAnalysis;
use crate::utils::telegram::{escape_html, start_chat_action_heartbeat};
use crate::utils::timing::{complete_command_timer, start_command_timer};

/// Shown while the photo is being analysed.
pub const ANALYSIS_CHAT_ACTION: ChatAction = ChatAction::UploadPhoto;

/// Message body and keyboard for one tab of the recommendation browser.
pub fn render_tab(
    state: &AppState,
    analysis: &ProfileAnalysis,
    tab: Tab,
    generation: u64,
) -> (String, InlineKeyboardMarkup) {
    let view = TabView::build(&analysis.profile, tab, &state.links);
    let keyboard = tab_keyboard(&view, analysis.profile.gender, generation);
    (view.render_html(), keyboard)
}

pub async fn photo_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let mut timer = start_command_timer("photo", &message);
    let Some(source) = photo_source(&message) else {
        complete_command_timer(&mut timer, "ignored", Some("not_an_image".to_string()));
        return Ok(());
    };
    let chat_id = message.chat.id;

    let status = bot
        .send_message(chat_id, "Scanning your features…")
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;

    let photo = match download_photo(&bot, &state, &source).await {
        Ok(photo) => photo,
        Err(err) => {
            error!("Photo download failed for chat {}: {}", chat_id.0, err);
            let text = escape_html(&err.to_string());
            edit_html_with_retry(&bot, chat_id, status.id, &text, None).await?;
            complete_command_timer(&mut timer, "error", Some("download".to_string()));
            return Ok(());
        }
    };

    let outcome = {
        let _chat_action = start_chat_action_heartbeat(bot.clone(), chat_id, ANALYSIS_CHAT_ACTION);
        analyze_photo(state.stylist.as_ref(), &state.sessions, chat_id.0, photo).await
    };

    match outcome {
        Ok(AnalysisOutcome::Applied { token, analysis }) => {
            info!(
                "Analysis applied for chat {} (generation {})",
                chat_id.0, token.generation
            );
            edit_html_with_retry(
                &bot,
                chat_id,
                status.id,
                &profile_summary_html(&analysis),
                None,
            )
            .await?;
            let (text, keyboard) = render_tab(&state, &analysis, Tab::default(), token.generation);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
            let status = if analysis.is_complete() { "success" } else { "partial" };
            complete_command_timer(&mut timer, status, None);
        }
        Ok(AnalysisOutcome::Superseded) => {
            edit_html_with_retry(
                &bot,
                chat_id,
                status.id,
                "A newer photo replaced this one.",
                None,
            )
            .await?;
            complete_command_timer(&mut timer, "superseded", None);
        }
        Err(err) => {
            error!("Style analysis failed for chat {}: {}", chat_id.0, err);
            edit_html_with_retry(
                &bot,
                chat_id,
                status.id,
                &escape_html(&failure_text("style analysis", &err)),
                None,
            )
            .await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_shows_upload_photo_status() {
        assert_eq!(ANALYSIS_CHAT_ACTION, ChatAction::UploadPhoto);
    }
}
