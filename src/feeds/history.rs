use super::{HistoryFeed, FEED_TIMEOUT};
use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const API_BASE: &str = "https://history.muffinlabs.com/date";

const FEED: &str = "history";

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub enum EventKind {
    Event,
    Birth,
    Death,
}

#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub struct HistoricalEvent {
    pub year: i32,
    pub description: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Deserialize)]
struct DayResponse {
    data: DaySections,
}

#[derive(Debug, Clone, Deserialize)]
struct DaySections {
    #[serde(rename = "Events", default)]
    events: Vec<RawEntry>,
    #[serde(rename = "Births", default)]
    births: Vec<RawEntry>,
    #[serde(rename = "Deaths", default)]
    deaths: Vec<RawEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    year: String,
    text: String,
}

/// On-this-day events from the muffinlabs history API. Pure function of
/// (month, day); the year never enters the request.
#[derive(Debug, Clone)]
pub struct HistoryFeedFetcher {
    client: reqwest::Client,
}

impl HistoryFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HistoryFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryFeed for HistoryFeedFetcher {
    async fn fetch(&self, month: u32, day: u32) -> Result<Vec<HistoricalEvent>, FetchError> {
        let url = format!("{API_BASE}/{month}/{day}");
        let response = self
            .client
            .get(&url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?;
        let day_response = response
            .json::<DayResponse>()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?;

        let events = events_from_response(day_response);
        log::info!("Fetched {} events for {month}/{day}", events.len());
        Ok(events)
    }
}

/// Merge events, births and deaths into one list, drop entries whose year
/// does not parse, and suppress duplicate (year, description) pairs while
/// keeping source order.
fn events_from_response(response: DayResponse) -> Vec<HistoricalEvent> {
    let DaySections {
        events,
        births,
        deaths,
    } = response.data;

    let tagged = events
        .into_iter()
        .map(|raw| (EventKind::Event, raw.text, raw.year))
        .chain(
            births
                .into_iter()
                .map(|raw| (EventKind::Birth, format!("{} was born", raw.text), raw.year)),
        )
        .chain(
            deaths
                .into_iter()
                .map(|raw| (EventKind::Death, format!("{} died", raw.text), raw.year)),
        );

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for (kind, description, raw_year) in tagged {
        let year = match raw_year.trim().parse::<i32>() {
            Ok(year) => year,
            Err(_) => {
                log::debug!("Skipping entry with non-numeric year {raw_year:?}");
                continue;
            }
        };
        if seen.insert((year, description.clone())) {
            result.push(HistoricalEvent {
                year,
                description,
                kind,
            });
        }
    }
    result
}

const INTERESTING_KEYWORDS: &[&str] = &[
    "invented",
    "discovered",
    "war",
    "revolution",
    "expedition",
    "founded",
    "abolished",
    "assassinated",
    "crowned",
    "treaty",
    "exploration",
    "scientific",
    "disaster",
    "miracle",
    "scandal",
];

/// Pick the `count` most promising events for commentary. Prefers genuinely
/// historical entries (older than fifty years), keyword-rich descriptions
/// and events over births/deaths. Stable: ties keep source order.
pub fn select_events(
    events: &[HistoricalEvent],
    count: usize,
    current_year: i32,
) -> Vec<HistoricalEvent> {
    let historical: Vec<&HistoricalEvent> = events
        .iter()
        .filter(|event| event.year < current_year - 50)
        .collect();
    let pool: Vec<&HistoricalEvent> = if historical.is_empty() {
        events.iter().collect()
    } else {
        historical
    };

    let mut scored: Vec<(i32, &HistoricalEvent)> = pool
        .into_iter()
        .map(|event| {
            let description = event.description.to_lowercase();
            let mut score = 0;
            for keyword in INTERESTING_KEYWORDS {
                if description.contains(keyword) {
                    score += 10;
                }
            }
            if event.kind == EventKind::Event {
                score += 5;
            }
            if description.len() > 50 {
                score += 3;
            }
            (score, event)
        })
        .collect();

    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored
        .into_iter()
        .take(count)
        .map(|(_, event)| event.clone())
        .collect()
}
