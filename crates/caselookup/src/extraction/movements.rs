//! Movement (timeline) tables.
//!
//! Two row shapes are recognised by cell count:
//!
//! | cells | layout                                   |
//! |-------|------------------------------------------|
//! | 2-3   | date, description, optional extra        |
//! | 4+    | ordinal, date, event type, detail        |
//!
//! Description parts are joined with [`PART_SEPARATOR`]. Header rows and
//! rows without a description are dropped.

use super::element_text;
use super::parties::is_header_row;
use crate::types::{MovementEvent, Origin};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};

pub const PART_SEPARATOR: &str = " — ";

/// Try row selectors in order; the first yielding any event wins.
pub(crate) fn extract_movements(
    document: &Html,
    tables: &[Selector],
    origin: Origin,
) -> Vec<MovementEvent> {
    for rows in tables {
        let events: Vec<MovementEvent> = document
            .select(rows)
            .filter_map(|row| movement_from_row(&row, origin))
            .collect();
        if !events.is_empty() {
            return events;
        }
    }
    Vec::new()
}

fn movement_from_row(row: &ElementRef<'_>, origin: Origin) -> Option<MovementEvent> {
    if is_header_row(row) {
        return None;
    }
    let cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(|c| element_text(&c))
        .collect();

    let (date, description) = match cells.as_slice() {
        [date, description] => (date.clone(), description.clone()),
        [date, description, extra] => (date.clone(), join_parts(description, extra)),
        [_ordinal, date, kind, detail, ..] => (date.clone(), join_parts(kind, detail)),
        _ => return None,
    };

    if description.is_empty() {
        return None;
    }
    Some(MovementEvent {
        date,
        description,
        qualifiers: Vec::new(),
        source: origin,
    })
}

fn join_parts(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (false, false) => format!("{first}{PART_SEPARATOR}{second}"),
        (false, true) => first.to_string(),
        (true, _) => second.to_string(),
    }
}

/// Parse the date formats the sources emit. `None` for anything else.
pub fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y%m%d%H%M%S",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
