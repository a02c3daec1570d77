use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::browser::{LinkSettings, ShareDispatch};
use crate::config::SHARE_TEXT;
use crate::handlers::keyboards::share_keyboard;
use crate::stylist::{
    PlanIssue, ProfileAnalysis, StyleCategory, StylistError, WeeklyPlan,
};
use crate::utils::telegram::escape_html;

pub const STALE_SELECTION_TEXT: &str =
    "That belongs to an older photo. Use the buttons under your latest analysis.";

fn or_unknown(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(escape_html)
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn profile_summary_html(analysis: &ProfileAnalysis) -> String {
    let profile = &analysis.profile;
    let mut text = String::from("<b>Your style profile</b>\n");
    text.push_str(&format!(
        "Face shape: {}\n",
        or_unknown(profile.face_shape.as_deref())
    ));
    text.push_str(&format!(
        "Skin tone: {}",
        or_unknown(profile.skin_tone.as_deref())
    ));
    if let Some(undertone) = profile.undertone {
        text.push_str(&format!(" ({} undertone)", undertone.as_str()));
    }
    text.push_str(&format!(
        "\nGender: {}",
        profile
            .gender
            .map(|gender| gender.as_str())
            .unwrap_or("unknown")
    ));

    if !analysis.is_complete() {
        let notes = analysis
            .issues
            .iter()
            .map(|issue| escape_html(&issue.to_string()))
            .collect::<Vec<_>>()
            .join("; ");
        text.push_str(&format!("\n\n<i>Partial result: {notes}.</i>"));
    }
    text
}

pub fn weekly_plan_html(plan: &WeeklyPlan) -> String {
    if plan.days.is_empty() {
        return "No style calendar came back this time. Tap 📅 7-day plan to try again."
            .to_string();
    }
    let mut text = String::from("<b>Your 7-day style calendar</b>");
    for day in &plan.days {
        text.push_str(&format!(
            "\n\n<b>{}</b> · {}\n{}",
            escape_html(day.day.trim()),
            escape_html(day.occasion.trim()),
            escape_html(day.outfit.trim())
        ));
    }
    for issue in &plan.issues {
        if let PlanIssue::DayCount { expected, actual } = issue {
            text.push_str(&format!(
                "\n\n<i>Only {actual} of {expected} days were planned.</i>"
            ));
        }
    }
    text
}

pub fn try_on_caption(item: &str, category: StyleCategory) -> String {
    format!(
        "<b>Try-on</b> ({}): {}",
        category.as_str(),
        escape_html(item.trim())
    )
}

/// Share message and buttons. A native share gets Telegram's share sheet with
/// the WhatsApp link beside it; otherwise only the WhatsApp link is offered.
pub fn share_message(
    links: &LinkSettings,
    native_available: bool,
) -> (String, InlineKeyboardMarkup) {
    match links.share_dispatch(native_available) {
        ShareDispatch::Native { title, text, url } => (
            format!("<b>{}</b>\n{}", escape_html(&title), escape_html(&text)),
            share_keyboard(
                Some(links.telegram_share_url(&text, &url)),
                links.fallback_share_url(),
            ),
        ),
        ShareDispatch::Link(fallback) => {
            (escape_html(SHARE_TEXT), share_keyboard(None, fallback))
        }
    }
}

/// What the user sees when a style request fails.
pub fn failure_text(action: &str, err: &StylistError) -> String {
    match err {
        StylistError::MissingProfile | StylistError::UnknownSelection => err.to_string(),
        StylistError::MalformedResponse(_) => format!(
            "Sorry, the {action} came back garbled. Please try again or send a clearer photo."
        ),
        _ => format!("Sorry, the {action} failed.\n\nError: {err}"),
    }
}

fn is_not_modified(err: &RequestError) -> bool {
    matches!(err, RequestError::Api(ApiError::MessageNotModified))
}

/// Edits a message in place, retrying transient failures. Re-selecting the
/// current tab is not an error.
pub async fn edit_html_with_retry(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let mut delay = Duration::from_secs_f32(1.5);
    for attempt in 0..3 {
        let request = bot
            .edit_message_text(chat_id, message_id, text.to_string())
            .parse_mode(ParseMode::Html);
        let request = match keyboard.clone() {
            Some(markup) => request.reply_markup(markup),
            None => request,
        };

        match request.await {
            Ok(_) => return Ok(()),
            Err(err) if is_not_modified(&err) => {
                debug!("edit_message_text skipped: message unchanged");
                return Ok(());
            }
            Err(err) => {
                if attempt == 2 {
                    return Err(err.into());
                }
                warn!("edit_message_text failed: {err}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylist::{Gender, StyleProfile, Undertone, WeeklyPlanDay};
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn complete_summary_has_no_partial_notice() {
        let mut analysis = ProfileAnalysis::empty();
        analysis.issues.clear();
        analysis.profile = StyleProfile {
            face_shape: Some("Oval".into()),
            skin_tone: Some("Tan".into()),
            undertone: Some(Undertone::Warm),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let html = profile_summary_html(&analysis);
        assert!(html.contains("Face shape: Oval"));
        assert!(html.contains("Skin tone: Tan (Warm undertone)"));
        assert!(html.contains("Gender: Female"));
        assert!(!html.contains("Partial result"));
    }

    fn share_buttons(keyboard: &InlineKeyboardMarkup) -> Vec<(String, String)> {
        keyboard.inline_keyboard[0]
            .iter()
            .map(|button| match &button.kind {
                InlineKeyboardButtonKind::Url(url) => (button.text.clone(), url.to_string()),
                other => panic!("unexpected button kind {other:?}"),
            })
            .collect()
    }

    #[test]
    fn native_share_offers_telegram_and_whatsapp() {
        let links = LinkSettings::defaults();
        let (text, keyboard) = share_message(&links, true);
        assert!(text.starts_with("<b>Check out my StyloGlo Makeover!</b>"));
        let buttons = share_buttons(&keyboard);
        assert_eq!(buttons.len(), 2);
        assert!(buttons[0].1.starts_with("https://t.me/share/url?url="));
        assert!(buttons[1].1.starts_with("https://wa.me/?text="));
    }

    #[test]
    fn share_without_native_support_offers_only_whatsapp() {
        let links = LinkSettings::defaults();
        let (text, keyboard) = share_message(&links, false);
        assert_eq!(text, SHARE_TEXT);
        let buttons = share_buttons(&keyboard);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].1, links.fallback_share_url().to_string());
    }

    #[test]
    fn partial_summary_lists_issues() {
        let html = profile_summary_html(&ProfileAnalysis::empty());
        assert!(html.contains("Face shape: unknown"));
        assert!(html.contains("<i>Partial result: the style service returned no data"));
    }

    #[test]
    fn plan_renders_days_and_shortfall() {
        let plan = WeeklyPlan::from_days(vec![WeeklyPlanDay {
            day: "Monday".into(),
            occasion: "Office".into(),
            outfit: "Navy blazer & chinos".into(),
        }]);
        let html = weekly_plan_html(&plan);
        assert!(html.contains("<b>Monday</b> · Office\nNavy blazer &amp; chinos"));
        assert!(html.contains("Only 1 of 7 days were planned."));
        assert!(weekly_plan_html(&WeeklyPlan::empty()).starts_with("No style calendar"));
    }

    #[test]
    fn try_on_failures_show_the_error() {
        let text = failure_text("try-on", &StylistError::NoImageProduced);
        assert!(text.contains("Error: No image generated by the model."));
        assert_eq!(
            failure_text("try-on", &StylistError::MissingProfile),
            "No style profile yet. Send a photo first."
        );
    }
}
