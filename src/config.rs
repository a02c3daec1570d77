use std::env;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_analysis_model: String,
    pub gemini_image_model: String,
    pub gemini_safety_settings: String,
    pub gemini_request_timeout_seconds: u64,
    pub gemini_max_attempts: usize,
    pub marketplace_base_url: String,
    pub maps_base_url: String,
    pub preview_image_base_url: String,
    pub preview_image_size: u32,
    pub share_app_url: String,
    pub max_photo_bytes: usize,
    pub session_ttl_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn trim_base_url(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "standard".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to standard.",
                value
            );
            "standard".to_string()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("BOT_TOKEN is required"));
        }

        let gemini_api_key = env_string("GEMINI_API_KEY", "");
        if gemini_api_key.trim().is_empty() {
            warn!("GEMINI_API_KEY is empty; every style request will be rejected upstream.");
        }

        Ok(Config {
            bot_token,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            gemini_api_key,
            gemini_api_base_url: trim_base_url(env_string(
                "GEMINI_API_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_analysis_model: env_string("GEMINI_ANALYSIS_MODEL", "gemini-2.5-flash"),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "standard",
            )),
            gemini_request_timeout_seconds: env_u64("GEMINI_REQUEST_TIMEOUT_SECONDS", 90),
            gemini_max_attempts: env_usize("GEMINI_MAX_ATTEMPTS", 1).max(1),
            marketplace_base_url: trim_base_url(env_string(
                "MARKETPLACE_BASE_URL",
                "https://www.amazon.com",
            )),
            maps_base_url: trim_base_url(env_string(
                "MAPS_BASE_URL",
                "https://www.google.com/maps",
            )),
            preview_image_base_url: trim_base_url(env_string(
                "PREVIEW_IMAGE_BASE_URL",
                "https://image.pollinations.ai/prompt",
            )),
            preview_image_size: env_u32("PREVIEW_IMAGE_SIZE", 400),
            share_app_url: env_string("SHARE_APP_URL", "https://t.me/"),
            max_photo_bytes: env_usize("MAX_PHOTO_BYTES", 10 * 1024 * 1024),
            session_ttl_seconds: env_u64("SESSION_TTL_SECONDS", 3600).max(60),
        })
    }
}

pub const ANALYSIS_INSTRUCTION: &str = "Analyze this person's face shape, skin tone, and gender.
Create a style profile with exactly 5 recommendations for each category based on their features.

If Male:
- Hair: 5 trendy hairstyles suitable for their face shape.
- Beard: 5 beard styles (or clean shaven options) matching their jawline.
- Sunglasses: 5 specific sunglasses shapes/styles.
- Colors: 5 outfit color palettes or specific clothing styles suitable for their skin tone.
- Tattoos: 5 tattoo concepts including the body part (e.g. \"Tribal design on forearm\").

If Female:
- Hair: 5 trendy hairstyles suitable for their face shape.
- Sunglasses: 5 specific sunglasses shapes/styles.
- Colors: 5 outfit color palettes or specific clothing styles.
- Earrings: 5 earring styles (e.g. \"Gold Hoops\", \"Diamond Studs\").
- Makeup: 5 lipstick shades or makeup looks (e.g. \"Matte Red Lipstick\", \"Nude Gloss & Peach Blush\").
- Eyebrows: 5 eyebrow shapes (e.g. \"Soft Arch\", \"Thick Natural\").
- Eyelashes: 5 eyelash styles (e.g. \"Cat Eye Wispy\", \"Natural Volume\").
- Stickers: 5 face stickers or bindis styles.
- Tattoos: 5 tattoo concepts including the body part.

Ensure 'gender' is strictly 'Male' or 'Female'.";

pub const TRY_ON_PRESERVE_SUFFIX: &str = "Keep the person's identity, face shape, skin tone, expression and the background unchanged. The result must be a photorealistic edit of the original photo.";

pub const SHARE_TITLE: &str = "Check out my StyloGlo Makeover!";
pub const SHARE_TEXT: &str = "I just used AI to find my perfect style. Check it out on StyloGlo!";

pub const HELP_TEXT: &str = "Send me a clear, front-facing photo and I will work out your face shape, skin tone and undertone, then suggest hairstyles, colours, accessories and more.

Browse the tabs under the result, tap Try on to see a look on your own photo, or Shop to search for it.

Commands:
/plan - a 7-day outfit calendar for your profile
/share - share the app with friends
/nearby - find salons or beauty parlors near you
/reset - forget your photo and profile";
