//! Parties and their counsel.
//!
//! A party block reads like `NAME Advogado: LAWYER (OAB SP1234) Advogada:
//! OTHER`. The name is everything before the first counsel marker; each
//! marker starts one lawyer entry, with an optional parenthesized bar
//! registration at its end.

use super::element_text;
use crate::types::{Lawyer, Party};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Where party rows live and which cells hold the role and the block.
#[derive(Debug)]
pub struct PartyLayout {
    pub rows: Selector,
    pub role: Option<Selector>,
    pub block: Selector,
}

fn counsel_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:advogad[oa]s?|adv\.?|procurador(?:\(es\)|es|a)?|defensor(?:a)?|counsel|atty\.?)\s*:",
        )
        .expect("counsel marker regex is valid")
    })
}

fn trailing_registration() -> &'static Regex {
    static REGISTRATION: OnceLock<Regex> = OnceLock::new();
    REGISTRATION.get_or_init(|| {
        Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*$").expect("registration regex is valid")
    })
}

/// Try layouts in order; the first producing any party wins.
pub(crate) fn extract_parties(document: &Html, layouts: &[PartyLayout]) -> Vec<Party> {
    for layout in layouts {
        let parties: Vec<Party> = document
            .select(&layout.rows)
            .filter(|row| !is_header_row(row))
            .filter_map(|row| party_from_row(&row, layout))
            .collect();
        if !parties.is_empty() {
            return parties;
        }
    }
    Vec::new()
}

fn party_from_row(row: &ElementRef<'_>, layout: &PartyLayout) -> Option<Party> {
    let block = row.select(&layout.block).next()?;
    let role = layout
        .role
        .as_ref()
        .and_then(|sel| row.select(sel).next())
        .map(|el| element_text(&el))
        .unwrap_or_default();
    parse_party_block(&role, &element_text(&block))
}

/// Rows made only of header cells are table captions, not parties.
pub(crate) fn is_header_row(row: &ElementRef<'_>) -> bool {
    let mut cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .peekable();
    cells.peek().is_some() && cells.all(|c| c.value().name() == "th")
}

/// Split a party block into the party name and its lawyers.
///
/// Returns `None` when no name precedes the first counsel marker.
pub fn parse_party_block(role: &str, block: &str) -> Option<Party> {
    let text = super::normalize_whitespace(block);
    let markers: Vec<_> = counsel_marker().find_iter(&text).collect();

    let name_end = markers.first().map_or(text.len(), |m| m.start());
    let name = clean(&text[..name_end]);
    if name.is_empty() {
        return None;
    }

    let lawyers = markers
        .iter()
        .enumerate()
        .filter_map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            parse_lawyer(&text[marker.end()..end])
        })
        .collect();

    Some(Party {
        role: clean(role.trim_end_matches(':')),
        name,
        lawyers,
    })
}

fn parse_lawyer(segment: &str) -> Option<Lawyer> {
    let segment = clean(segment);
    let (name, registration) = match trailing_registration().captures(&segment) {
        Some(caps) => (clean(&caps[1]), clean(&caps[2])),
        None => (segment.clone(), String::new()),
    };
    if name.is_empty() {
        return None;
    }
    Some(Lawyer { name, registration })
}

fn clean(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == ',' || c == ';' || c == '-' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_counsel_markers() {
        let party = parse_party_block(
            "Reqte",
            "JOSÉ DA SILVA Advogado: MARIA SOUZA (OAB SP123456) Advogada: ANA LIMA (OAB 98765/SP)",
        )
        .unwrap();
        assert_eq!(party.role, "Reqte");
        assert_eq!(party.name, "JOSÉ DA SILVA");
        assert_eq!(party.lawyers.len(), 2);
        assert_eq!(party.lawyers[0].name, "MARIA SOUZA");
        assert_eq!(party.lawyers[0].registration, "OAB SP123456");
        assert_eq!(party.lawyers[1].name, "ANA LIMA");
        assert_eq!(party.lawyers[1].registration, "OAB 98765/SP");
    }

    #[test]
    fn test_block_without_counsel() {
        let party = parse_party_block("Reqdo:", "  BANCO EXEMPLO S.A.\n ").unwrap();
        assert_eq!(party.role, "Reqdo");
        assert_eq!(party.name, "BANCO EXEMPLO S.A.");
        assert!(party.lawyers.is_empty());
    }

    #[test]
    fn test_marker_variants() {
        let party = parse_party_block(
            "AUTOR",
            "CARLOS PEREIRA Procurador(es): JOÃO NUNES (RS054321) Adv.: PEDRO ALVES Atty.: JANE DOE",
        )
        .unwrap();
        let names: Vec<_> = party.lawyers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["JOÃO NUNES", "PEDRO ALVES", "JANE DOE"]);
        assert_eq!(party.lawyers[0].registration, "RS054321");
        assert_eq!(party.lawyers[1].registration, "");
    }

    #[test]
    fn test_marker_needs_word_boundary() {
        let party = parse_party_block("", "ADVENTISTA: IGREJA LOCAL").unwrap();
        assert_eq!(party.name, "ADVENTISTA: IGREJA LOCAL");
        assert!(party.lawyers.is_empty());
    }

    #[test]
    fn test_block_starting_with_marker_has_no_party() {
        assert!(parse_party_block("Reqte", "Advogado: MARIA SOUZA").is_none());
    }

    #[test]
    fn test_empty_marker_segment_is_skipped() {
        let party = parse_party_block("Reqte", "FULANO Advogado: Advogada: BELTRANA (OAB 1)").unwrap();
        assert_eq!(party.lawyers.len(), 1);
        assert_eq!(party.lawyers[0].name, "BELTRANA");
    }

    #[test]
    fn test_header_rows_are_skipped() {
        let html = r#"<table id="p">
            <tr><th>Tipo</th><th>Nome</th></tr>
            <tr><td class="r">Reqte</td><td class="b">FULANO</td></tr>
        </table>"#;
        let doc = Html::parse_document(html);
        let layout = PartyLayout {
            rows: Selector::parse("#p tr").unwrap(),
            role: Some(Selector::parse("td.r").unwrap()),
            block: Selector::parse("td.b, th:last-child").unwrap(),
        };
        let parties = extract_parties(&doc, &[layout]);
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].name, "FULANO");
    }
}
