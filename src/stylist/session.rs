use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::tabs::Tab;
use crate::llm::media::ImagePayload;
use crate::stylist::prompts::try_on_prompt;
use crate::stylist::{
    ProfileAnalysis, RecommendationField, StyleAdvisor, StyleCategory, StylistError, WeeklyPlan,
};

/// Identifies the analysis a response belongs to. A token whose generation is
/// no longer the chat's current one is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub chat_id: i64,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanToken {
    pub chat_id: i64,
    pub generation: u64,
    pub plan_generation: u64,
}

#[derive(Debug, Clone)]
pub struct StyleSession {
    pub generation: u64,
    pub photo: Option<ImagePayload>,
    pub analysis: Option<ProfileAnalysis>,
    pub active_tab: Tab,
    pub plan: Option<WeeklyPlan>,
    pub plan_generation: u64,
    pub awaiting_location: bool,
    pub last_used: Instant,
}

impl StyleSession {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            photo: None,
            analysis: None,
            active_tab: Tab::default(),
            plan: None,
            plan_generation: 0,
            awaiting_location: false,
            last_used: Instant::now(),
        }
    }
}

/// Per-chat sessions. Generations come from one store-wide counter, so a
/// chat whose session was evicted never reuses a generation an old button
/// still carries.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<i64, StyleSession>>>,
    generations: Arc<AtomicU64>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            idle_ttl,
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self, chat_id: i64) -> Option<StyleSession> {
        self.sessions.lock().get(&chat_id).cloned()
    }

    pub fn reset(&self, chat_id: i64) {
        // A fresh generation keeps in-flight responses for the old photo stale.
        let session = StyleSession::new(self.next_generation());
        self.sessions.lock().insert(chat_id, session);
    }

    /// Drops sessions idle for longer than the TTL. Returns how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| {
            now.saturating_duration_since(session.last_used) <= self.idle_ttl
        });
        before - sessions.len()
    }

    /// Sweeps idle sessions every `every` until the runtime shuts down.
    pub fn spawn_eviction(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!("Evicted {} idle style sessions", evicted);
                }
            }
        })
    }

    pub fn begin_analysis(&self, chat_id: i64, photo: ImagePayload) -> RequestToken {
        let generation = self.next_generation();
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| StyleSession::new(generation));
        session.generation = generation;
        session.last_used = Instant::now();
        session.photo = Some(photo);
        session.analysis = None;
        session.plan = None;
        session.active_tab = Tab::Hair;
        RequestToken {
            chat_id,
            generation: session.generation,
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.sessions
            .lock()
            .get(&token.chat_id)
            .map(|session| session.generation == token.generation)
            .unwrap_or(false)
    }

    /// Stores the analysis unless a newer photo arrived meanwhile.
    pub fn complete_analysis(&self, token: RequestToken, analysis: ProfileAnalysis) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&token.chat_id) {
            Some(session) if session.generation == token.generation => {
                session.analysis = Some(analysis);
                true
            }
            _ => false,
        }
    }

    /// Switches the visible tab of a current profile. Returns the analysis and
    /// the tab that was showing before.
    pub fn set_active_tab(&self, token: RequestToken, tab: Tab) -> Option<(ProfileAnalysis, Tab)> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&token.chat_id)?;
        if session.generation != token.generation {
            return None;
        }
        let analysis = session.analysis.clone()?;
        session.last_used = Instant::now();
        let previous = std::mem::replace(&mut session.active_tab, tab);
        Some((analysis, previous))
    }

    pub fn begin_plan(&self, chat_id: i64) -> Result<(PlanToken, ProfileAnalysis), StylistError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&chat_id)
            .ok_or(StylistError::MissingProfile)?;
        let analysis = session
            .analysis
            .clone()
            .ok_or(StylistError::MissingProfile)?;
        session.last_used = Instant::now();
        session.plan_generation += 1;
        Ok((
            PlanToken {
                chat_id,
                generation: session.generation,
                plan_generation: session.plan_generation,
            },
            analysis,
        ))
    }

    pub fn complete_plan(&self, token: PlanToken, plan: WeeklyPlan) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&token.chat_id) {
            Some(session)
                if session.generation == token.generation
                    && session.plan_generation == token.plan_generation =>
            {
                session.plan = Some(plan);
                true
            }
            _ => false,
        }
    }

    pub fn set_awaiting_location(&self, chat_id: i64, awaiting: bool) {
        let mut sessions = self.sessions.lock();
        // Generation 0 is never issued, so no token matches a photo-less session.
        let session = sessions.entry(chat_id).or_insert_with(|| StyleSession::new(0));
        session.last_used = Instant::now();
        session.awaiting_location = awaiting;
    }

    /// Returns whether the chat was waiting for a location, clearing the flag.
    pub fn take_awaiting_location(&self, chat_id: i64) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&chat_id) {
            Some(session) => std::mem::replace(&mut session.awaiting_location, false),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Applied {
        token: RequestToken,
        analysis: ProfileAnalysis,
    },
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryOnOutcome {
    Edited {
        item: String,
        category: StyleCategory,
        image: ImagePayload,
    },
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Ready(WeeklyPlan),
    Superseded,
}

pub async fn analyze_photo<A: StyleAdvisor>(
    advisor: &A,
    store: &SessionStore,
    chat_id: i64,
    photo: ImagePayload,
) -> Result<AnalysisOutcome, StylistError> {
    let token = store.begin_analysis(chat_id, photo.clone());
    let result = advisor.analyze_image_style(&photo).await;

    match result {
        Ok(analysis) => {
            if store.complete_analysis(token, analysis.clone()) {
                Ok(AnalysisOutcome::Applied { token, analysis })
            } else {
                info!(
                    "Dropping stale style analysis for chat {} (generation {})",
                    chat_id, token.generation
                );
                Ok(AnalysisOutcome::Superseded)
            }
        }
        Err(err) if !store.is_current(token) => {
            warn!("Stale style analysis for chat {} failed: {}", chat_id, err);
            Ok(AnalysisOutcome::Superseded)
        }
        Err(err) => Err(err),
    }
}

/// Edits the chat's current photo with the selected recommendation. The
/// selection carries the generation it was rendered for.
pub async fn request_try_on<A: StyleAdvisor>(
    advisor: &A,
    store: &SessionStore,
    token: RequestToken,
    field: RecommendationField,
    index: usize,
) -> Result<TryOnOutcome, StylistError> {
    let Some(session) = store.snapshot(token.chat_id) else {
        return Err(StylistError::MissingProfile);
    };
    if session.generation != token.generation {
        return Ok(TryOnOutcome::Superseded);
    }
    let (Some(photo), Some(analysis)) = (session.photo, session.analysis) else {
        return Err(StylistError::MissingProfile);
    };
    let item = analysis
        .profile
        .recommendations
        .item(field, index)
        .ok_or(StylistError::UnknownSelection)?
        .to_string();
    let category = field.category();
    let prompt = try_on_prompt(&item, category, analysis.profile.gender);

    let data_uri = match advisor.edit_user_image(&photo, &prompt).await {
        Ok(data_uri) => data_uri,
        Err(err) if !store.is_current(token) => {
            warn!(
                "Stale try-on for chat {} (generation {}) failed: {}",
                token.chat_id, token.generation, err
            );
            return Ok(TryOnOutcome::Superseded);
        }
        Err(err) => return Err(err),
    };
    if !store.is_current(token) {
        info!(
            "Dropping stale try-on result for chat {} (generation {})",
            token.chat_id, token.generation
        );
        return Ok(TryOnOutcome::Superseded);
    }
    let image = ImagePayload::parse(&data_uri)?;
    Ok(TryOnOutcome::Edited {
        item,
        category,
        image,
    })
}

pub async fn request_weekly_plan<A: StyleAdvisor>(
    advisor: &A,
    store: &SessionStore,
    chat_id: i64,
) -> Result<PlanOutcome, StylistError> {
    let (token, analysis) = store.begin_plan(chat_id)?;
    let plan = advisor
        .generate_weekly_style_plan(&analysis.profile)
        .await?;
    if store.complete_plan(token, plan.clone()) {
        Ok(PlanOutcome::Ready(plan))
    } else {
        info!("Dropping stale weekly plan for chat {}", chat_id);
        Ok(PlanOutcome::Superseded)
    }
}
