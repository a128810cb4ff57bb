use super::{time_window, OutageFeed, OutageKind, OutageRecord, FEED_TIMEOUT};
use crate::error::FetchError;
use async_trait::async_trait;
use scraper::{Html, Selector};

pub const INFO_CENTER_URL: &str = "https://gispx.sofiyskavoda.bg/WebApp.InfoCenter/?a=0&tab=0";

const FEED: &str = "water outage";

// Field labels as they appear in the info-center markup.
const LOCATION_LABEL: &str = "Местоположение:";
const FIELD_LABELS: &[&str] = &["Тип:", "Описание:", "Начало:", "Край:"];
const START_LABEL: &str = "Начало:";
const END_LABEL: &str = "Край:";

/// Sofia Water interruption notices, scraped from the info-center page.
/// Parsing is best effort: sections or rows that do not match the expected
/// markup are skipped and logged, never fatal.
#[derive(Debug, Clone)]
pub struct OutageFeedFetcher {
    client: reqwest::Client,
}

impl OutageFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OutageFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutageFeed for OutageFeedFetcher {
    async fn fetch(&self) -> Result<Vec<OutageRecord>, FetchError> {
        let html = self
            .client
            .get(INFO_CENTER_URL)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(FEED, err))?;

        let records = parse_stops(&html);
        log::info!("Fetched {} water stop announcements", records.len());
        Ok(records)
    }
}

pub(crate) fn parse_stops(html: &str) -> Vec<OutageRecord> {
    let document = Html::parse_document(html);
    let sections = [
        ("infrastructureAlertsContent", OutageKind::Current),
        ("sanitaryBackupContent", OutageKind::Planned),
    ];

    let mut records = Vec::new();
    for (section_id, kind) in sections {
        let selector_str =
            format!("div#{section_id} table.tableWaterStopInfo tr.trRowDefault td");
        let Ok(selector) = Selector::parse(&selector_str) else {
            log::warn!("Invalid selector for section {section_id}");
            continue;
        };

        let mut section_count = 0;
        for cell in document.select(&selector) {
            let text = cell
                .text()
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            let location = extract_field(&text, LOCATION_LABEL);
            let start = extract_field(&text, START_LABEL);
            let end = extract_field(&text, END_LABEL);

            if location.is_none() && start.is_none() && end.is_none() {
                log::debug!("Skipping unparseable water stop row in {section_id}");
                continue;
            }

            records.push(OutageRecord {
                kind,
                area_description: location.unwrap_or_else(|| "Location not specified".into()),
                time_window: time_window(start, end),
            });
            section_count += 1;
        }
        log::debug!("Parsed {section_count} rows in section {section_id}");
    }
    records
}

/// Pull the value following `label` out of a newline-joined cell, stopping at
/// the next known field label.
fn extract_field(text: &str, label: &str) -> Option<String> {
    let (_, remaining) = text.split_once(label)?;
    let mut end = remaining.len();
    for marker in FIELD_LABELS.iter().chain(std::iter::once(&LOCATION_LABEL)) {
        if let Some(pos) = remaining.find(marker) {
            end = end.min(pos);
        }
    }
    let value = remaining[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
        <div id="infrastructureAlertsContent">
          <table class="tableWaterStopInfo">
            <tr class="trRowDefault"><td>
              Местоположение: ул. Пиротска 15
              Тип: Авария
              Начало: 09:00 29.08.2026
              Край: 17:00 29.08.2026
            </td></tr>
            <tr class="trRowDefault"><td>Nothing useful here</td></tr>
          </table>
        </div>
        <div id="sanitaryBackupContent">
          <table class="tableWaterStopInfo">
            <tr class="trRowDefault"><td>
              Местоположение: кв. Драгалевци
              Начало: 08:30 30.08.2026
              Край: 16:00 30.08.2026
            </td></tr>
          </table>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_current_and_planned_sections() {
        let records = parse_stops(FIXTURE);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, OutageKind::Current);
        assert_eq!(records[0].area_description, "ул. Пиротска 15");
        assert_eq!(
            records[0].time_window.as_deref(),
            Some("09:00 29.08.2026 → 17:00 29.08.2026")
        );

        assert_eq!(records[1].kind, OutageKind::Planned);
        assert_eq!(records[1].area_description, "кв. Драгалевци");
    }

    #[test]
    fn empty_page_yields_no_records() {
        assert!(parse_stops("<html><body></body></html>").is_empty());
    }

    #[test]
    fn row_without_labels_is_skipped() {
        let html = r#"
            <div id="infrastructureAlertsContent">
              <table class="tableWaterStopInfo">
                <tr class="trRowDefault"><td>free-form text</td></tr>
              </table>
            </div>
        "#;
        assert!(parse_stops(html).is_empty());
    }

    #[test]
    fn missing_times_leave_window_empty() {
        let html = r#"
            <div id="infrastructureAlertsContent">
              <table class="tableWaterStopInfo">
                <tr class="trRowDefault"><td>Местоположение: ж.к. Люлин 4</td></tr>
              </table>
            </div>
        "#;
        let records = parse_stops(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].area_description, "ж.к. Люлин 4");
        assert_eq!(records[0].time_window, None);
    }
}
