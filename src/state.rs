use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::browser::LinkSettings;
use crate::stylist::session::SessionStore;
use crate::stylist::GeminiStylist;

#[derive(Clone)]
pub struct AppState {
    pub stylist: Arc<GeminiStylist>,
    pub sessions: SessionStore,
    pub links: Arc<LinkSettings>,
    pub http: Client,
    pub bot_token: Arc<str>,
    pub max_photo_bytes: usize,
}

impl AppState {
    pub fn new(
        stylist: GeminiStylist,
        links: LinkSettings,
        http: Client,
        bot_token: &str,
        max_photo_bytes: usize,
        session_ttl: Duration,
    ) -> Self {
        AppState {
            stylist: Arc::new(stylist),
            sessions: SessionStore::new(session_ttl),
            links: Arc::new(links),
            http,
            bot_token: Arc::from(bot_token),
            max_photo_bytes,
        }
    }
}
