//! Tolerant extraction of case records from portal markup.
//!
//! Portal pages drift between deployments and versions, so nothing here
//! assumes one page shape. A [`PortalRules`] table lists, per field and per
//! repeating group, the strategies to try in priority order; the first one
//! that yields non-empty, whitespace-normalized text wins.
//!
//! Before any field is read the page is checked for sentinels: a "not found"
//! phrase or a login form means no record, and a results list without
//! detail-page markers yields the link to follow.
//!
//! Everything here is synchronous: `scraper::Html` is `!Send`, so the
//! document never lives across an `.await`.

pub mod movements;
pub mod parties;
pub mod rules;

pub use movements::parse_event_date;
pub use parties::parse_party_block;
pub use rules::{PortalRules, Strategy};

use crate::types::{SourceKey, SourceRecord};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::fmt;

/// Result of running the engine over one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(SourceRecord),
    NoRecord(NoRecordReason),
    /// The page is a results list; the detail page is at this (possibly
    /// relative) href.
    Redirect(String),
}

/// Why a source answered without a record. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoRecordReason {
    /// The source says the case does not exist.
    NotFound,
    /// The page asks for credentials; never pursued.
    LoginRequired,
    /// The page parsed but carried no field, party or movement.
    Empty,
    /// A detail link led to yet another results list.
    RedirectLoop,
    /// The structured API matched zero hits.
    NoHits,
}

impl fmt::Display for NoRecordReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoRecordReason::NotFound => "not-found",
            NoRecordReason::LoginRequired => "login-required",
            NoRecordReason::Empty => "empty",
            NoRecordReason::RedirectLoop => "redirect-loop",
            NoRecordReason::NoHits => "no-hits",
        })
    }
}

/// Run the engine over a page fetched for `key`.
pub fn extract(html: &str, rules: &PortalRules, key: SourceKey) -> Extraction {
    let document = Html::parse_document(html);

    if let Some(signal) = detect_sentinel(&document, rules) {
        return signal;
    }

    let mut record = SourceRecord::new(key);
    for (field, strategies) in &rules.fields {
        if let Some(value) = first_match(&document, strategies, rules) {
            record.details.set(*field, value);
        }
    }
    record.parties = parties::extract_parties(&document, &rules.parties);
    record.movements = movements::extract_movements(&document, &rules.movements, key.origin);

    match record.non_empty() {
        Some(record) => Extraction::Record(record),
        None => Extraction::NoRecord(NoRecordReason::Empty),
    }
}

fn detect_sentinel(document: &Html, rules: &PortalRules) -> Option<Extraction> {
    let text = element_text(&document.root_element()).to_lowercase();
    if rules.not_found.iter().any(|phrase| text.contains(phrase.as_str())) {
        return Some(Extraction::NoRecord(NoRecordReason::NotFound));
    }

    if any_match(document, &rules.login) {
        return Some(Extraction::NoRecord(NoRecordReason::LoginRequired));
    }

    if !any_match(document, &rules.detail_markers) {
        let href = rules.result_links.iter().find_map(|sel| {
            document
                .select(sel)
                .filter_map(|a| a.value().attr("href"))
                .map(str::trim)
                .find(|h| !h.is_empty())
        });
        if let Some(href) = href {
            return Some(Extraction::Redirect(href.to_string()));
        }
    }

    None
}

fn any_match(document: &Html, selectors: &[Selector]) -> bool {
    selectors.iter().any(|sel| document.select(sel).next().is_some())
}

/// Try strategies in order; the first non-empty value wins.
pub(crate) fn first_match(
    document: &Html,
    strategies: &[Strategy],
    rules: &PortalRules,
) -> Option<String> {
    strategies.iter().find_map(|strategy| match strategy {
        Strategy::Css(sel) => document
            .select(sel)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty()),
        Strategy::Attr(sel, attr) => document
            .select(sel)
            .filter_map(|el| el.value().attr(attr))
            .map(normalize_whitespace)
            .find(|t| !t.is_empty()),
        Strategy::Label(captions) => label_value(document, rules, captions),
    })
}

/// Find an element whose whole text is one of `captions` and read the value
/// beside it: the immediate next sibling element, or, when the caption has
/// no sibling element, whatever follows it inside the parent.
///
/// A value that itself reads as a caption belongs to the next field and is
/// rejected, so a blank value stays blank.
fn label_value(document: &Html, rules: &PortalRules, captions: &[String]) -> Option<String> {
    for el in document.select(&rules.label_candidates) {
        let own = element_text(&el);
        if own.is_empty() || !captions.contains(&caption_key(&own)) {
            continue;
        }

        let value = match el.next_siblings().find_map(ElementRef::wrap) {
            Some(sibling) => Some(element_text(&sibling)),
            None => el.parent().and_then(ElementRef::wrap).and_then(|parent| {
                let whole = element_text(&parent);
                whole
                    .strip_prefix(own.as_str())
                    .map(|rest| rest.trim_start_matches([':', ' ']).trim().to_string())
            }),
        };
        if let Some(value) = value {
            if !value.is_empty() && !reads_as_caption(&value, &rules.known_captions) {
                return Some(value);
            }
        }
    }
    None
}

fn reads_as_caption(text: &str, known: &[String]) -> bool {
    text.trim_end().ends_with(':') || known.contains(&caption_key(text))
}

/// Comparison key for captions: whitespace-normalized, lowercased, without
/// a trailing colon.
pub(crate) fn caption_key(text: &str) -> String {
    normalize_whitespace(text)
        .trim_end_matches(':')
        .trim_end()
        .to_lowercase()
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elements whose text content is never rendered as page text.
const NON_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text of an element, whitespace-collapsed. Text nodes are joined
/// with a space so `<br>`-separated segments stay apart; script, style,
/// noscript and template content is skipped.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    let parts: Vec<&str> = el
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| NON_TEXT_ELEMENTS.contains(&a.value().name()))
        })
        .map(|(_, text)| &**text)
        .collect();
    normalize_whitespace(&parts.join(" "))
}
