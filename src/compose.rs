use crate::cache::FreshnessCache;
use crate::config::HeraldConfig;
use crate::error::{ComposeError, FetchError, GenerationError};
use crate::feeds::{
    select_events, ElectricityFeedFetcher, HistoricalEvent, HistoryFeed, HistoryFeedFetcher,
    OutageFeed, OutageFeedFetcher, OutageKind, OutageRecord,
};
use crate::style::{StylePreset, StyleSelector};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Attempt ceiling and backoff base shared by the generation call and the
/// feed fetches. Waits are 1s, then 2s.
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// How many events make it into the prompt.
const SELECTED_EVENT_COUNT: usize = 10;

/// Leave headroom under the platform's 2000-character message limit.
pub const MESSAGE_LIMIT: usize = 1900;

/// Text-generation backend. Implemented by the embedding binary; the
/// composer only builds prompts and retries rate limits.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str, style_hint: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub text: String,
    pub style: StylePreset,
}

pub(crate) struct OutageSectionStyle {
    title: &'static str,
    source: &'static str,
    current_heading: &'static str,
    planned_heading: &'static str,
    current_marker: &'static str,
    planned_marker: &'static str,
}

pub(crate) const WATER_SECTION: OutageSectionStyle = OutageSectionStyle {
    title: "\u{1F4A7} **Water Supply Interruptions**",
    source: "Sofia Water",
    current_heading: "CURRENT STOPS",
    planned_heading: "PLANNED STOPS",
    current_marker: "\u{23F0}",
    planned_marker: "\u{1F4C5}",
};

pub(crate) const POWER_SECTION: OutageSectionStyle = OutageSectionStyle {
    title: "\u{1F50C} **Electricity Supply Interruptions**",
    source: "ERM Zapad",
    current_heading: "CURRENT OUTAGES",
    planned_heading: "PLANNED MAINTENANCE",
    current_marker: "\u{23F0}",
    planned_marker: "\u{1F4C5}",
};

/// Pure transform from (events, outages, style) to message text, plus the
/// network orchestration to obtain those inputs. Owns the feed caches; the
/// fetchers themselves stay stateless.
pub struct ContentComposer {
    history: Arc<dyn HistoryFeed>,
    water: Arc<dyn OutageFeed>,
    power: Arc<dyn OutageFeed>,
    generation: Arc<dyn GenerationClient>,
    history_cache: FreshnessCache<(u32, u32), Vec<HistoricalEvent>>,
    outage_cache: FreshnessCache<&'static str, Vec<OutageRecord>>,
    styles: StyleSelector,
    feed_ttl: Duration,
    generation_timeout: Duration,
}

impl ContentComposer {
    pub fn new(config: &HeraldConfig, generation: Arc<dyn GenerationClient>) -> Self {
        Self::with_feeds(
            config,
            Arc::new(HistoryFeedFetcher::new()),
            Arc::new(OutageFeedFetcher::new()),
            Arc::new(ElectricityFeedFetcher::new()),
            generation,
            StyleSelector::new(),
        )
    }

    pub fn with_feeds(
        config: &HeraldConfig,
        history: Arc<dyn HistoryFeed>,
        water: Arc<dyn OutageFeed>,
        power: Arc<dyn OutageFeed>,
        generation: Arc<dyn GenerationClient>,
        styles: StyleSelector,
    ) -> Self {
        Self {
            history,
            water,
            power,
            generation,
            history_cache: FreshnessCache::new(),
            outage_cache: FreshnessCache::new(),
            styles,
            feed_ttl: config.feed_ttl,
            generation_timeout: config.generation_timeout,
        }
    }

    /// Build the full daily message for `date`. History is required; either
    /// outage feed failing (after retries) degrades to an omitted section so
    /// the post still goes out.
    pub async fn compose(&self, date: NaiveDate) -> Result<ComposedMessage, ComposeError> {
        let (events, water, power) = futures::join!(
            self.history_events(date.month(), date.day()),
            self.water_outages(),
            self.power_outages(),
        );
        let events = events?;
        let water = water.unwrap_or_else(|err| {
            log::warn!("Water outage feed unavailable, omitting section: {err}");
            Vec::new()
        });
        let power = power.unwrap_or_else(|err| {
            log::warn!("Electricity outage feed unavailable, omitting section: {err}");
            Vec::new()
        });

        let style = self.styles.next();
        let selected = select_events(&events, SELECTED_EVENT_COUNT, date.year());
        let prompt = style.prompt(&events_text(&selected));
        let commentary = self.generate_with_retry(&prompt, style).await?;

        Ok(ComposedMessage {
            text: render_message(&commentary, &water, &power),
            style,
        })
    }

    /// Cached history fetch, keyed by (month, day).
    pub async fn history_events(
        &self,
        month: u32,
        day: u32,
    ) -> Result<Vec<HistoricalEvent>, FetchError> {
        self.history_cache
            .get_or_fetch((month, day), self.feed_ttl, || async move {
                retry_fetch("history", || self.history.fetch(month, day)).await
            })
            .await
    }

    pub async fn water_outages(&self) -> Result<Vec<OutageRecord>, FetchError> {
        self.outage_cache
            .get_or_fetch("water", self.feed_ttl, || async move {
                retry_fetch("water outage", || self.water.fetch()).await
            })
            .await
    }

    pub async fn power_outages(&self) -> Result<Vec<OutageRecord>, FetchError> {
        self.outage_cache
            .get_or_fetch("power", self.feed_ttl, || async move {
                retry_fetch("electricity outage", || self.power.fetch()).await
            })
            .await
    }

    async fn generate_with_retry(
        &self,
        prompt: &str,
        style: StylePreset,
    ) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.generation_timeout,
                self.generation.generate(prompt, style.name()),
            )
            .await
            {
                Ok(result) => result,
                Err(_elapsed) => Err(GenerationError::Timeout),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(err) if err.retryable() && attempt < RETRY_ATTEMPTS => {
                    let wait = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    log::warn!(
                        "Generation attempt {attempt} failed ({err}), retrying in {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

async fn retry_fetch<T, F, Fut>(what: &'static str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable() && attempt < RETRY_ATTEMPTS => {
                let wait = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                log::warn!("{what} fetch attempt {attempt} failed ({err}), retrying in {wait:?}");
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn events_text(events: &[HistoricalEvent]) -> String {
    let mut text = String::new();
    for (i, event) in events.iter().enumerate() {
        let _ = writeln!(text, "{}. In {}, {}", i + 1, event.year, event.description);
    }
    text
}

/// Styled commentary first, then the water and electricity summaries. Either
/// section disappears entirely when its feed reported nothing.
fn render_message(commentary: &str, water: &[OutageRecord], power: &[OutageRecord]) -> String {
    let mut text = truncate_at_boundary(commentary, MESSAGE_LIMIT);
    if let Some(section) = render_outage_section(&WATER_SECTION, water) {
        text.push_str("\n\n");
        text.push_str(&section);
    }
    if let Some(section) = render_outage_section(&POWER_SECTION, power) {
        text.push_str("\n\n");
        text.push_str(&section);
    }
    text
}

/// None when there is nothing to report. Current entries always precede
/// planned ones; inside a group the feed's order is preserved.
pub(crate) fn render_outage_section(
    style: &OutageSectionStyle,
    records: &[OutageRecord],
) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let current: Vec<&OutageRecord> = records
        .iter()
        .filter(|r| r.kind == OutageKind::Current)
        .collect();
    let planned: Vec<&OutageRecord> = records
        .iter()
        .filter(|r| r.kind == OutageKind::Planned)
        .collect();

    let mut out = format!(
        "{}\n_{} announces the following interruptions:_\n",
        style.title, style.source
    );
    for (heading, marker, group) in [
        (style.current_heading, style.current_marker, &current),
        (style.planned_heading, style.planned_marker, &planned),
    ] {
        if group.is_empty() {
            continue;
        }
        let _ = write!(out, "\n**{heading}** ({})\n", group.len());
        for (i, record) in group.iter().enumerate() {
            let _ = writeln!(out, "**{}.** {}", i + 1, clip(&record.area_description, 100));
            if let Some(window) = &record.time_window {
                let _ = writeln!(out, "   {marker} {window}");
            }
        }
    }
    Some(out)
}

fn clip(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Cut over-long commentary at the last sentence end before `limit`, falling
/// back to a word boundary, and note the cut.
pub(crate) fn truncate_at_boundary(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &text[..cut];

    let sentence_end = [". ", "! ", "? "]
        .iter()
        .filter_map(|pattern| head.rfind(pattern))
        .max();
    let kept = match sentence_end {
        Some(pos) if pos > limit / 2 => &head[..=pos],
        _ => match head.rfind(' ') {
            Some(pos) if pos > limit / 2 => &head[..pos],
            _ => head,
        },
    };

    format!(
        "{}\n\n_[The commentary continues, but the message limit does not.]_",
        kept.trim_end()
    )
}
