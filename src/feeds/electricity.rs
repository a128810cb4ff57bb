use super::{time_window, OutageFeed, OutageKind, OutageRecord, FEED_TIMEOUT};
use crate::error::FetchError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;

pub const AVPLAN_URL: &str = "https://info.ermzapad.bg/webint/vok/avplan.php";

const FEED: &str = "electricity outage";
/// Only Sofia-grad municipalities are of interest.
const REGION_FILTER: &str = "SOF";

/// ERM Zapad outage announcements. The main page lists affected
/// municipalities; a draw request per municipality returns the actual
/// outage map as JSON. Per-municipality failures are logged and skipped so
/// one broken entry cannot empty the whole digest.
#[derive(Debug, Clone)]
pub struct ElectricityFeedFetcher {
    client: reqwest::Client,
}

impl ElectricityFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_municipality(
        &self,
        muni_id: &str,
        muni_name: &str,
    ) -> Result<Vec<OutageRecord>, FetchError> {
        let form = [
            ("action", "draw"),
            ("gm_obstina", muni_id),
            ("lat", "0"),
            ("lon", "0"),
        ];
        let text = self
            .client
            .post(AVPLAN_URL)
            .form(&form)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?;

        parse_outages(&text, muni_name)
    }
}

impl Default for ElectricityFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutageFeed for ElectricityFeedFetcher {
    async fn fetch(&self) -> Result<Vec<OutageRecord>, FetchError> {
        let html = self
            .client
            .get(AVPLAN_URL)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?;

        let municipalities = parse_municipality_ids(&html);
        log::info!("Found {} affected municipalities", municipalities.len());

        let mut records = Vec::new();
        for (muni_id, muni_name) in &municipalities {
            match self.fetch_municipality(muni_id, muni_name).await {
                Ok(mut outages) => records.append(&mut outages),
                Err(err) => {
                    log::error!("Error fetching outage details for {muni_id}: {err}");
                    continue;
                }
            }
        }

        let records = dedupe(records);
        log::info!("Fetched {} unique electricity outage announcements", records.len());
        Ok(records)
    }
}

/// Extract `(municipality id, display name)` pairs from the landing page.
/// The list items carry `onclick="show_obstina('SOF43','SOF')"` handlers.
pub(crate) fn parse_municipality_ids(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("li[onclick]") else {
        return Vec::new();
    };

    let mut municipalities = Vec::new();
    for li in document.select(&selector) {
        let Some(onclick) = li.value().attr("onclick") else {
            continue;
        };
        let Some((muni_id, region)) = parse_show_obstina(onclick) else {
            continue;
        };
        if region != REGION_FILTER {
            continue;
        }

        let raw_name = li.text().collect::<Vec<_>>().join(" ");
        let name = clean_municipality_name(&raw_name);
        log::debug!("Found municipality: {muni_id} - {name}");
        municipalities.push((muni_id, name));
    }
    municipalities
}

fn parse_show_obstina(onclick: &str) -> Option<(String, String)> {
    let rest = onclick.split("show_obstina('").nth(1)?;
    let (muni_id, rest) = rest.split_once('\'')?;
    let rest = rest.strip_prefix(",'")?;
    let (region, _) = rest.split_once('\'')?;
    if muni_id.is_empty() {
        return None;
    }
    Some((muni_id.to_string(), region.to_string()))
}

fn clean_municipality_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.to_lowercase().starts_with("община") {
        trimmed["община".len()..].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// The draw response is a JSON object of outages keyed by arbitrary ids,
/// plus a `cnt` member. `typedist` containing "планиран" marks planned work;
/// everything else is treated as a live outage. Records come out in document
/// order (serde_json's `preserve_order` feature), matching the feed.
pub(crate) fn parse_outages(text: &str, muni_name: &str) -> Result<Vec<OutageRecord>, FetchError> {
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() || text == "[]" || text == "{}" {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| FetchError::Parse {
            feed: FEED,
            detail: err.to_string(),
        })?;
    let Some(object) = value.as_object() else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for (key, outage) in object {
        if key == "cnt" {
            continue;
        }
        let Some(outage) = outage.as_object() else {
            continue;
        };

        let type_dist = outage
            .get("typedist")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        let kind = if type_dist.contains("планиран") {
            OutageKind::Planned
        } else {
            OutageKind::Current
        };

        let location = outage
            .get("city_name")
            .or_else(|| outage.get("cities"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(muni_name);
        let area_description = if location.to_uppercase().contains(&muni_name.to_uppercase()) {
            location.to_string()
        } else {
            format!("{location}, {muni_name}")
        };

        let start = outage
            .get("begin_event")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let end = outage
            .get("end_event")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        records.push(OutageRecord {
            kind,
            area_description,
            time_window: time_window(start, end),
        });
    }
    Ok(records)
}

fn dedupe(records: Vec<OutageRecord>) -> Vec<OutageRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sofia_municipalities_only() {
        let html = r#"
            <ul>
              <li onclick="show_obstina('SOF43','SOF')">община Витоша</li>
              <li onclick="show_obstina('PER12','PER')">община Перник</li>
              <li onclick="somethingElse()">noise</li>
            </ul>
        "#;
        let municipalities = parse_municipality_ids(html);
        assert_eq!(
            municipalities,
            vec![("SOF43".to_string(), "Витоша".to_string())]
        );
    }

    #[test]
    fn parses_draw_response() {
        let json = r#"{
            "cnt": 2,
            "a1": {
                "typedist": "Планирано прекъсване",
                "city_name": "кв. Бояна",
                "begin_event": "30.08.2026 09:00",
                "end_event": "30.08.2026 16:00"
            },
            "a2": {
                "typedist": "Авария",
                "cities": "с. Владая",
                "begin_event": "29.08.2026 10:00",
                "end_event": "29.08.2026 14:00"
            }
        }"#;
        let mut records = parse_outages(json, "Витоша").unwrap();
        records.sort_by(|a, b| a.area_description.cmp(&b.area_description));

        assert_eq!(records.len(), 2);
        let planned = records
            .iter()
            .find(|r| r.kind == OutageKind::Planned)
            .unwrap();
        assert_eq!(planned.area_description, "кв. Бояна, Витоша");
        assert_eq!(
            planned.time_window.as_deref(),
            Some("30.08.2026 09:00 → 30.08.2026 16:00")
        );
        assert!(records.iter().any(|r| r.kind == OutageKind::Current));
    }

    #[test]
    fn draw_response_keeps_document_order() {
        // Keys deliberately out of alphabetical order.
        let json = r#"{
            "z9": {"typedist": "Авария", "city_name": "кв. Бояна"},
            "a1": {"typedist": "Авария", "city_name": "с. Владая"}
        }"#;
        let records = parse_outages(json, "Витоша").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].area_description, "кв. Бояна, Витоша");
        assert_eq!(records[1].area_description, "с. Владая, Витоша");
    }

    #[test]
    fn empty_or_blank_payloads_are_fine() {
        assert!(parse_outages("", "Витоша").unwrap().is_empty());
        assert!(parse_outages("{}", "Витоша").unwrap().is_empty());
        assert!(parse_outages("\u{feff}[]", "Витоша").unwrap().is_empty());
    }

    #[test]
    fn garbage_payload_is_a_parse_error() {
        assert!(parse_outages("<html>oops</html>", "Витоша").is_err());
    }

    #[test]
    fn duplicate_records_collapse() {
        let record = OutageRecord {
            kind: OutageKind::Current,
            area_description: "кв. Бояна".into(),
            time_window: None,
        };
        let deduped = dedupe(vec![record.clone(), record.clone()]);
        assert_eq!(deduped.len(), 1);
    }
}
