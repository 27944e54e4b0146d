//! Ad eligibility and display-template selection.
//!
//! An ad is shown to a visitor only when every targeting rule passes; the
//! survivors are ordered by priority and paired with the template that
//! renders their `ad_type`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::{Ad, AdType, TargetAudience};

/// Target page marker that matches every page.
pub const ALL_PAGES: &str = "*";

/// Delay before any template becomes visible.
pub const SHOW_DELAY: Duration = Duration::from_millis(500);

/// Idle seconds after which a visitor's dismissals are forgotten.
pub const SESSION_IDLE_SECS: i64 = 30 * 60;

pub struct VisitContext<'a> {
    pub now: DateTime<Utc>,
    pub page: &'a str,
    pub new_visitor: bool,
    pub dismissed: &'a HashSet<String>,
}

pub fn is_eligible(ad: &Ad, ctx: &VisitContext<'_>) -> bool {
    if !ad.is_active || ctx.dismissed.contains(&ad.id) {
        return false;
    }

    if ad.start_date.is_some_and(|start| start > ctx.now) {
        return false;
    }
    if ad.end_date.is_some_and(|end| end < ctx.now) {
        return false;
    }

    // A cap of zero is treated as no cap.
    if let Some(cap) = ad.max_impressions.filter(|cap| *cap > 0) {
        if ad.current_impressions >= cap {
            return false;
        }
    }

    if !ad.target_pages.is_empty()
        && !ad.target_pages.iter().any(|p| p == ctx.page || p == ALL_PAGES)
    {
        return false;
    }

    match ad.target_audience {
        TargetAudience::All => true,
        TargetAudience::NewVisitors => ctx.new_visitor,
        TargetAudience::ReturningVisitors => !ctx.new_visitor,
    }
}

/// Eligible ads, highest priority first. Ties keep their input order.
pub fn eligible_ads(ads: Vec<Ad>, ctx: &VisitContext<'_>) -> Vec<Ad> {
    let mut eligible: Vec<Ad> = ads.into_iter().filter(|ad| is_eligible(ad, ctx)).collect();
    eligible.sort_by(|a, b| b.priority.cmp(&a.priority));
    eligible
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdPosition {
    Centered,
    Right,
    BottomRight,
    Inline,
    TopRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdTemplate {
    pub ad_type: AdType,
    pub position: AdPosition,
    #[serde(rename = "auto_close_ms", serialize_with = "as_millis")]
    pub auto_close: Duration,
    #[serde(rename = "show_delay_ms", serialize_with = "as_millis")]
    pub show_delay: Duration,
    pub closable: bool,
}

impl AdTemplate {
    pub fn for_type(ad_type: AdType) -> Self {
        let (position, auto_close_secs) = match ad_type {
            AdType::Popup => (AdPosition::Centered, 8),
            AdType::SlideIn => (AdPosition::Right, 6),
            AdType::Floating => (AdPosition::BottomRight, 10),
            AdType::Banner => (AdPosition::Inline, 15),
            AdType::Notification => (AdPosition::TopRight, 5),
        };
        AdTemplate {
            ad_type,
            position,
            auto_close: Duration::from_secs(auto_close_secs),
            show_delay: SHOW_DELAY,
            closable: true,
        }
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Clone, Serialize)]
pub struct AdPlacement {
    pub ad: Ad,
    pub template: AdTemplate,
}

pub fn select_placements(ads: Vec<Ad>, ctx: &VisitContext<'_>) -> Vec<AdPlacement> {
    eligible_ads(ads, ctx)
        .into_iter()
        .map(|ad| {
            let template = AdTemplate::for_type(ad.ad_type);
            AdPlacement { ad, template }
        })
        .collect()
}

#[derive(Debug)]
struct VisitorSession {
    page: String,
    closed_on_page: HashSet<String>,
    closed_in_session: HashSet<String>,
    last_seen: DateTime<Utc>,
}

impl VisitorSession {
    fn new(page: &str, now: DateTime<Utc>) -> Self {
        VisitorSession {
            page: page.to_owned(),
            closed_on_page: HashSet::new(),
            closed_in_session: HashSet::new(),
            last_seen: now,
        }
    }

    fn visit(&mut self, page: &str, now: DateTime<Utc>) {
        if self.page != page {
            self.page = page.to_owned();
            self.closed_on_page.clear();
        }
        self.last_seen = now;
    }

    fn dismissed(&self) -> HashSet<String> {
        self.closed_on_page
            .union(&self.closed_in_session)
            .cloned()
            .collect()
    }
}

/// Per-visitor dismissal memory.
///
/// Dismissals live in two sets: one cleared whenever the visitor moves to a
/// different page, and one kept for the whole session. Nothing is persisted.
#[derive(Debug, Default)]
pub struct AdSessions {
    sessions: Mutex<HashMap<String, VisitorSession>>,
}

impl AdSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a page view and returns the ads dismissed so far.
    pub async fn visit(&self, session: &str, page: &str, now: DateTime<Utc>) -> HashSet<String> {
        let mut sessions = self.sessions.lock().await;
        prune(&mut sessions, now);
        let entry = sessions
            .entry(session.to_owned())
            .or_insert_with(|| VisitorSession::new(page, now));
        entry.visit(page, now);
        entry.dismissed()
    }

    pub async fn dismiss(&self, session: &str, page: &str, ad_id: &str, now: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().await;
        prune(&mut sessions, now);
        let entry = sessions
            .entry(session.to_owned())
            .or_insert_with(|| VisitorSession::new(page, now));
        entry.visit(page, now);
        entry.closed_on_page.insert(ad_id.to_owned());
        entry.closed_in_session.insert(ad_id.to_owned());
        log::debug!("session {} dismissed ad {} on {}", session, ad_id, page);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn prune(sessions: &mut HashMap<String, VisitorSession>, now: DateTime<Utc>) {
    sessions.retain(|_, s| (now - s.last_seen).num_seconds() <= SESSION_IDLE_SECS);
}
