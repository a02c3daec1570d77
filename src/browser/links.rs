use anyhow::{anyhow, Result};
use reqwest::Url;

use crate::config::{Config, SHARE_TEXT, SHARE_TITLE};
use crate::stylist::{Gender, StyleCategory};

const NEARBY_ZOOM: &str = "14z";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of asking the user where they are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFix {
    Position(Coordinates),
    Denied,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShareDispatch {
    Native {
        title: String,
        text: String,
        url: String,
    },
    Link(Url),
}

/// Base URLs for every page the bot links out to. Parsed once so the builders
/// below cannot fail.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    marketplace_base: Url,
    maps_base: Url,
    preview_base: Url,
    preview_size: u32,
    telegram_share_base: Url,
    whatsapp_base: Url,
    app_url: String,
}

fn parse_base(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value.trim()).map_err(|err| anyhow!("Invalid {name} '{value}': {err}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("Invalid {name} '{value}': not a base URL"));
    }
    Ok(url)
}

impl LinkSettings {
    pub fn new(
        marketplace_base: &str,
        maps_base: &str,
        preview_base: &str,
        preview_size: u32,
        app_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            marketplace_base: parse_base("MARKETPLACE_BASE_URL", marketplace_base)?,
            maps_base: parse_base("MAPS_BASE_URL", maps_base)?,
            preview_base: parse_base("PREVIEW_IMAGE_BASE_URL", preview_base)?,
            preview_size: preview_size.max(1),
            telegram_share_base: parse_base("telegram share", "https://t.me/share/url")?,
            whatsapp_base: parse_base("whatsapp share", "https://wa.me/")?,
            app_url: app_url.trim().to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.marketplace_base_url,
            &config.maps_base_url,
            &config.preview_image_base_url,
            config.preview_image_size,
            &config.share_app_url,
        )
    }

    #[cfg(test)]
    pub fn defaults() -> Self {
        Self::new(
            "https://www.amazon.com",
            "https://www.google.com/maps",
            "https://image.pollinations.ai/prompt",
            400,
            "https://t.me/",
        )
        .unwrap()
    }

    fn with_segments(base: &Url, segments: &[&str]) -> Url {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    pub fn shop_url(&self, item: &str, category: StyleCategory, gender: Option<Gender>) -> Url {
        let mut url = Self::with_segments(&self.marketplace_base, &["s"]);
        url.query_pairs_mut()
            .append_pair("k", &shop_query(item, category, gender));
        url
    }

    pub fn preview_url(&self, item: &str, category: StyleCategory, gender: Option<Gender>) -> Url {
        let prompt = preview_prompt(item, category, gender);
        let size = self.preview_size.to_string();
        let seed = preview_seed(&prompt).to_string();
        let mut url = Self::with_segments(&self.preview_base, &[&prompt]);
        url.query_pairs_mut()
            .append_pair("width", &size)
            .append_pair("height", &size)
            .append_pair("nologo", "true")
            .append_pair("seed", &seed);
        url
    }

    pub fn nearby_url(&self, gender: Option<Gender>, fix: LocationFix) -> Url {
        let term = nearby_term(gender);
        match fix {
            LocationFix::Position(coordinates) => {
                let center = format!(
                    "@{},{},{}",
                    coordinates.latitude, coordinates.longitude, NEARBY_ZOOM
                );
                Self::with_segments(&self.maps_base, &["search", term, &center])
            }
            LocationFix::Denied | LocationFix::Unsupported => {
                let query = format!("{term} near me");
                Self::with_segments(&self.maps_base, &["search", &query])
            }
        }
    }

    /// Native share when the platform offers it, otherwise a WhatsApp link.
    pub fn share_dispatch(&self, native_available: bool) -> ShareDispatch {
        if native_available {
            return ShareDispatch::Native {
                title: SHARE_TITLE.to_string(),
                text: SHARE_TEXT.to_string(),
                url: self.app_url.clone(),
            };
        }
        ShareDispatch::Link(self.fallback_share_url())
    }

    /// WhatsApp link carrying the share text and the app URL.
    pub fn fallback_share_url(&self) -> Url {
        let mut url = self.whatsapp_base.clone();
        url.query_pairs_mut()
            .append_pair("text", &format!("{} {}", SHARE_TEXT, self.app_url));
        url
    }

    /// Telegram's own share sheet for a native share.
    pub fn telegram_share_url(&self, text: &str, url: &str) -> Url {
        let mut share = self.telegram_share_base.clone();
        share
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair("text", text);
        share
    }
}

fn gender_term(gender: Option<Gender>) -> &'static str {
    if gender == Some(Gender::Male) {
        "men's"
    } else {
        "women's"
    }
}

fn gender_context(gender: Option<Gender>) -> &'static str {
    if gender == Some(Gender::Male) {
        "men"
    } else {
        "women"
    }
}

pub fn nearby_term(gender: Option<Gender>) -> &'static str {
    if gender == Some(Gender::Male) {
        "Men's Salon"
    } else {
        "Beauty Parlor"
    }
}

/// Marketplace search text for an item. Same inputs, same query.
pub fn shop_query(item: &str, category: StyleCategory, gender: Option<Gender>) -> String {
    let item = item.trim();
    let query = match category {
        StyleCategory::Hair => format!("{item} wig {}", gender_term(gender)),
        StyleCategory::Beard => format!("{item} beard care kit"),
        StyleCategory::Color => format!("{item} outfit {}", gender_term(gender)),
        StyleCategory::Accessory => format!("{item} {}", gender_term(gender)),
        StyleCategory::Makeup => format!("{item} makeup"),
        StyleCategory::Tattoo => format!("{item} temporary tattoo"),
        StyleCategory::Eyebrows | StyleCategory::Eyelashes => item.to_string(),
    };
    query.trim_end().to_string()
}

pub fn preview_prompt(item: &str, category: StyleCategory, gender: Option<Gender>) -> String {
    let item = item.trim();
    let context = gender_context(gender);
    match category {
        StyleCategory::Hair => format!(
            "photorealistic hairstyle {item} on {context} model, professional salon photography, studio lighting"
        ),
        StyleCategory::Beard => format!(
            "photorealistic beard style {item} on male model, close up face, studio lighting"
        ),
        StyleCategory::Makeup => {
            format!("photorealistic makeup look {item}, beauty photography, close up face")
        }
        StyleCategory::Tattoo => {
            format!("photorealistic tattoo design {item}, skin texture, ink detail")
        }
        _ => format!(
            "photorealistic product shot of {item} for {context}, high end commercial photography, white background"
        ),
    }
}

/// Stable 0..100 seed so a card keeps the same preview between renders.
fn preview_seed(prompt: &str) -> u32 {
    let hash = prompt.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    hash % 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_query_appends_category_suffix() {
        assert_eq!(
            shop_query("Undercut", StyleCategory::Hair, Some(Gender::Male)),
            "Undercut wig men's"
        );
        assert_eq!(
            shop_query("Goatee", StyleCategory::Beard, Some(Gender::Male)),
            "Goatee beard care kit"
        );
        assert_eq!(
            shop_query("Earth tones", StyleCategory::Color, Some(Gender::Female)),
            "Earth tones outfit women's"
        );
        assert_eq!(
            shop_query("Gold Hoops", StyleCategory::Accessory, Some(Gender::Female)),
            "Gold Hoops women's"
        );
        assert_eq!(
            shop_query("Matte Red Lipstick", StyleCategory::Makeup, None),
            "Matte Red Lipstick makeup"
        );
        assert_eq!(
            shop_query("Koi on shoulder", StyleCategory::Tattoo, None),
            "Koi on shoulder temporary tattoo"
        );
        assert_eq!(shop_query("Soft Arch", StyleCategory::Eyebrows, None), "Soft Arch");
    }

    #[test]
    fn shop_url_is_deterministic() {
        let links = LinkSettings::defaults();
        let first = links.shop_url("Side Part", StyleCategory::Hair, Some(Gender::Male));
        let second = links.shop_url("Side Part", StyleCategory::Hair, Some(Gender::Male));
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "https://www.amazon.com/s?k=Side+Part+wig+men%27s");
    }

    #[test]
    fn preview_url_encodes_prompt_in_path() {
        let links = LinkSettings::defaults();
        let url = links.preview_url("Crew Cut", StyleCategory::Hair, Some(Gender::Male));
        assert!(url
            .as_str()
            .starts_with("https://image.pollinations.ai/prompt/photorealistic%20hairstyle%20Crew%20Cut%20on%20men%20model"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("width".to_string(), "400".to_string()));
        assert_eq!(pairs[2], ("nologo".to_string(), "true".to_string()));
        let seed: u32 = pairs[3].1.parse().unwrap();
        assert!(seed < 100);
        assert_eq!(
            url,
            links.preview_url("Crew Cut", StyleCategory::Hair, Some(Gender::Male))
        );
    }

    #[test]
    fn preview_prompt_falls_back_to_product_shot() {
        assert_eq!(
            preview_prompt("Aviators", StyleCategory::Accessory, Some(Gender::Female)),
            "photorealistic product shot of Aviators for women, high end commercial photography, white background"
        );
    }

    #[test]
    fn nearby_url_centres_on_position() {
        let links = LinkSettings::defaults();
        let fix = LocationFix::Position(Coordinates {
            latitude: 40.7128,
            longitude: -74.006,
        });
        assert_eq!(
            links.nearby_url(Some(Gender::Male), fix).as_str(),
            "https://www.google.com/maps/search/Men's%20Salon/@40.7128,-74.006,14z"
        );
    }

    #[test]
    fn nearby_url_falls_back_to_near_me() {
        let links = LinkSettings::defaults();
        let expected = "https://www.google.com/maps/search/Beauty%20Parlor%20near%20me";
        assert_eq!(
            links
                .nearby_url(Some(Gender::Female), LocationFix::Denied)
                .as_str(),
            expected
        );
        assert_eq!(
            links.nearby_url(None, LocationFix::Unsupported).as_str(),
            expected
        );
    }

    #[test]
    fn share_falls_back_to_whatsapp_without_native_capability() {
        let links = LinkSettings::defaults();
        let ShareDispatch::Link(url) = links.share_dispatch(false) else {
            panic!("expected a fallback link");
        };
        assert!(url.as_str().starts_with("https://wa.me/?text=I+just+used+AI"));
        assert!(matches!(
            links.share_dispatch(true),
            ShareDispatch::Native { .. }
        ));
    }

    #[test]
    fn rejects_invalid_base_urls() {
        assert!(LinkSettings::new("not a url", "https://maps", "https://p", 400, "").is_err());
        assert!(LinkSettings::new(
            "https://shop",
            "mailto:maps@example.com",
            "https://p",
            400,
            ""
        )
        .is_err());
    }
}
