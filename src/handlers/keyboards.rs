use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use reqwest::Url;

use crate::browser::{RecommendationCard, Tab, TabView};
use crate::stylist::{Gender, RecommendationField};

pub const LOCATION_SHARE_TEXT: &str = "📍 Share my location";
pub const LOCATION_DECLINE_TEXT: &str = "No thanks";

const TRY_ON_LABEL_MAX_CHARS: usize = 24;

/// Inline button payloads. Anything tied to a profile carries the generation
/// it was rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Tab {
        generation: u64,
        tab: Tab,
    },
    TryOn {
        generation: u64,
        field: RecommendationField,
        index: usize,
    },
    Plan {
        generation: u64,
    },
    Share,
    Nearby {
        generation: u64,
    },
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Tab { generation, tab } => format!("tab:{generation}:{}", tab.id()),
            CallbackAction::TryOn {
                generation,
                field,
                index,
            } => format!("try:{generation}:{}:{index}", field.key()),
            CallbackAction::Plan { generation } => format!("plan:{generation}"),
            CallbackAction::Share => "share".to_string(),
            CallbackAction::Nearby { generation } => format!("nearby:{generation}"),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.trim().split(':');
        let kind = parts.next()?;
        let action = match kind {
            "share" => CallbackAction::Share,
            "tab" => CallbackAction::Tab {
                generation: parts.next()?.parse().ok()?,
                tab: Tab::from_id(parts.next()?)?,
            },
            "try" => CallbackAction::TryOn {
                generation: parts.next()?.parse().ok()?,
                field: RecommendationField::from_key(parts.next()?)?,
                index: parts.next()?.parse().ok()?,
            },
            "plan" => CallbackAction::Plan {
                generation: parts.next()?.parse().ok()?,
            },
            "nearby" => CallbackAction::Nearby {
                generation: parts.next()?.parse().ok()?,
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(action)
    }
}

fn clip_label(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let clipped: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", clipped.trim_end())
    } else {
        clipped
    }
}

fn tab_button(tab: Tab, active: Tab, gender: Option<Gender>, generation: u64) -> InlineKeyboardButton {
    let label = tab.label(gender);
    let text = if tab == active {
        format!("• {} {} •", label.icon, label.label)
    } else {
        format!("{} {}", label.icon, label.label)
    };
    InlineKeyboardButton::callback(text, CallbackAction::Tab { generation, tab }.encode())
}

fn card_row(card: &RecommendationCard, generation: u64) -> Vec<InlineKeyboardButton> {
    let try_on = CallbackAction::TryOn {
        generation,
        field: card.field,
        index: card.index,
    };
    vec![
        InlineKeyboardButton::callback(
            format!("🪄 {}", clip_label(&card.item, TRY_ON_LABEL_MAX_CHARS)),
            try_on.encode(),
        ),
        InlineKeyboardButton::url("🛒 Shop", card.shop_url.clone()),
        InlineKeyboardButton::url("🖼 Preview", card.preview_url.clone()),
    ]
}

/// Tab selector, one row per card, then the plan/nearby/share actions.
pub fn tab_keyboard(
    view: &TabView,
    gender: Option<Gender>,
    generation: u64,
) -> InlineKeyboardMarkup {
    let tab_buttons = Tab::ALL
        .iter()
        .map(|tab| tab_button(*tab, view.tab, gender, generation))
        .collect::<Vec<_>>();
    let mut rows = tab_buttons
        .chunks(3)
        .map(|chunk| chunk.to_vec())
        .collect::<Vec<_>>();

    rows.extend(view.cards().map(|card| card_row(card, generation)));

    rows.push(vec![
        InlineKeyboardButton::callback(
            "📅 7-day plan",
            CallbackAction::Plan { generation }.encode(),
        ),
        InlineKeyboardButton::callback(
            "📍 Nearby",
            CallbackAction::Nearby { generation }.encode(),
        ),
        InlineKeyboardButton::callback("📤 Share", CallbackAction::Share.encode()),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn share_keyboard(native: Option<Url>, fallback: Url) -> InlineKeyboardMarkup {
    let mut row = Vec::with_capacity(2);
    if let Some(native) = native {
        row.push(InlineKeyboardButton::url("📤 Share on Telegram", native));
    }
    row.push(InlineKeyboardButton::url("💬 WhatsApp", fallback));
    InlineKeyboardMarkup::new(vec![row])
}

pub fn location_request_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(LOCATION_SHARE_TEXT).request(ButtonRequest::Location)],
        vec![KeyboardButton::new(LOCATION_DECLINE_TEXT)],
    ])
}
