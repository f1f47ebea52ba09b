//! Portal rule tables: which selectors and captions to try, in which order.
//!
//! Rule sets are JSON embedded at compile time (`esaj_rules.json`,
//! `eproc_rules.json`) and compiled into `scraper` selectors once, when a
//! portal adapter is built. Order inside every list is priority order.

use super::parties::PartyLayout;
use crate::error::LookupError;
use crate::types::Field;
use scraper::Selector;
use serde::Deserialize;

const ESAJ_RULES_JSON: &str = include_str!("esaj_rules.json");
const EPROC_RULES_JSON: &str = include_str!("eproc_rules.json");

/// Elements that may hold a field caption for `label` strategies.
const LABEL_CANDIDATES: &str = "label, span, td, th, dt, div, strong, b, p, legend";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    not_found: Vec<String>,
    #[serde(default)]
    login: Vec<String>,
    #[serde(default)]
    detail_markers: Vec<String>,
    #[serde(default)]
    result_links: Vec<String>,
    #[serde(default)]
    fields: FieldTable,
    #[serde(default)]
    parties: Vec<PartyLayoutDef>,
    #[serde(default)]
    movements: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldTable {
    #[serde(default)]
    class: Vec<StrategyDef>,
    #[serde(default)]
    area: Vec<StrategyDef>,
    #[serde(default)]
    subject: Vec<StrategyDef>,
    #[serde(default)]
    distribution_date: Vec<StrategyDef>,
    #[serde(default)]
    judge: Vec<StrategyDef>,
    #[serde(default)]
    value: Vec<StrategyDef>,
    #[serde(default)]
    deciding_body: Vec<StrategyDef>,
    #[serde(default)]
    status: Vec<StrategyDef>,
}

impl FieldTable {
    fn into_entries(self) -> Vec<(Field, Vec<StrategyDef>)> {
        vec![
            (Field::Class, self.class),
            (Field::Area, self.area),
            (Field::Subject, self.subject),
            (Field::DistributionDate, self.distribution_date),
            (Field::Judge, self.judge),
            (Field::Value, self.value),
            (Field::DecidingBody, self.deciding_body),
            (Field::Status, self.status),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrategyDef {
    Css(String),
    Attr { css: String, attr: String },
    Label(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct PartyLayoutDef {
    rows: String,
    #[serde(default)]
    role: Option<String>,
    block: String,
}

/// One way of reading a field's value.
#[derive(Debug)]
pub enum Strategy {
    /// Text of the first matching element with non-empty text.
    Css(Selector),
    /// Attribute of the first matching element that carries it.
    Attr(Selector, String),
    /// Value next to a caption; captions are stored lowercased without a
    /// trailing colon.
    Label(Vec<String>),
}

/// Compiled rule set for one portal.
#[derive(Debug)]
pub struct PortalRules {
    pub(crate) name: &'static str,
    /// Lowercased phrases that mean "no such case".
    pub(crate) not_found: Vec<String>,
    pub(crate) login: Vec<Selector>,
    pub(crate) detail_markers: Vec<Selector>,
    pub(crate) result_links: Vec<Selector>,
    pub(crate) fields: Vec<(Field, Vec<Strategy>)>,
    pub(crate) parties: Vec<PartyLayout>,
    pub(crate) movements: Vec<Selector>,
    pub(crate) label_candidates: Selector,
    /// Every caption any field's label strategy looks for.
    pub(crate) known_captions: Vec<String>,
}

impl PortalRules {
    pub fn esaj() -> Result<Self, LookupError> {
        Self::from_json("esaj", ESAJ_RULES_JSON)
    }

    pub fn eproc() -> Result<Self, LookupError> {
        Self::from_json("eproc", EPROC_RULES_JSON)
    }

    /// Parse and compile a rule file.
    pub fn from_json(name: &'static str, json: &str) -> Result<Self, LookupError> {
        let file: RuleFile = serde_json::from_str(json).map_err(|e| LookupError::Rules {
            portal: name,
            message: e.to_string(),
        })?;
        let compiler = Compiler { name };

        let mut fields = Vec::new();
        for (field, specs) in file.fields.into_entries() {
            let strategies = specs
                .into_iter()
                .map(|def| compiler.strategy(def))
                .collect::<Result<Vec<_>, _>>()?;
            if !strategies.is_empty() {
                fields.push((field, strategies));
            }
        }

        let parties = file
            .parties
            .iter()
            .map(|p| {
                Ok(PartyLayout {
                    rows: compiler.selector(&p.rows)?,
                    role: p.role.as_deref().map(|r| compiler.selector(r)).transpose()?,
                    block: compiler.selector(&p.block)?,
                })
            })
            .collect::<Result<Vec<_>, LookupError>>()?;

        let known_captions = fields
            .iter()
            .flat_map(|(_, strategies)| strategies)
            .filter_map(|strategy| match strategy {
                Strategy::Label(captions) => Some(captions),
                _ => None,
            })
            .flatten()
            .cloned()
            .collect();

        Ok(Self {
            name,
            not_found: file
                .not_found
                .iter()
                .map(|p| super::normalize_whitespace(p).to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            login: compiler.selectors(&file.login)?,
            detail_markers: compiler.selectors(&file.detail_markers)?,
            result_links: compiler.selectors(&file.result_links)?,
            fields,
            parties,
            movements: compiler.selectors(&file.movements)?,
            label_candidates: compiler.selector(LABEL_CANDIDATES)?,
            known_captions,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

struct Compiler {
    name: &'static str,
}

impl Compiler {
    fn selector(&self, css: &str) -> Result<Selector, LookupError> {
        Selector::parse(css).map_err(|e| LookupError::Rules {
            portal: self.name,
            message: format!("bad selector {css:?}: {e:?}"),
        })
    }

    fn selectors(&self, list: &[String]) -> Result<Vec<Selector>, LookupError> {
        list.iter().map(|css| self.selector(css)).collect()
    }

    fn strategy(&self, def: StrategyDef) -> Result<Strategy, LookupError> {
        Ok(match def {
            StrategyDef::Css(css) => Strategy::Css(self.selector(&css)?),
            StrategyDef::Attr { css, attr } => Strategy::Attr(self.selector(&css)?, attr),
            StrategyDef::Label(captions) => Strategy::Label(
                captions.iter().map(|c| super::caption_key(c)).collect(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rule_sets_compile() {
        for rules in [PortalRules::esaj().unwrap(), PortalRules::eproc().unwrap()] {
            assert!(!rules.not_found.is_empty(), "{}", rules.name);
            assert!(!rules.detail_markers.is_empty(), "{}", rules.name);
            assert!(!rules.parties.is_empty(), "{}", rules.name);
            assert!(!rules.movements.is_empty(), "{}", rules.name);
            assert_eq!(rules.fields.len(), Field::ALL.len(), "{}", rules.name);
        }
    }

    #[test]
    fn test_field_order_is_preserved() {
        let rules = PortalRules::esaj().unwrap();
        let (field, strategies) = &rules.fields[0];
        assert_eq!(*field, Field::Class);
        assert!(matches!(strategies[0], Strategy::Css(_)));
        assert!(matches!(strategies.last(), Some(Strategy::Label(_))));
    }

    #[test]
    fn test_phrases_and_captions_are_normalized() {
        let rules = PortalRules::from_json(
            "test",
            r#"{"not_found": ["  Nada   ENCONTRADO "], "fields": {"class": [{"label": ["Classe:"]}]}}"#,
        )
        .unwrap();
        assert_eq!(rules.not_found, vec!["nada encontrado".to_string()]);
        match &rules.fields[0].1[0] {
            Strategy::Label(captions) => assert_eq!(captions, &vec!["classe".to_string()]),
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn test_invalid_selector_is_rules_error() {
        let err = PortalRules::from_json("broken", r#"{"movements": ["tr[[["]}"#).unwrap_err();
        assert!(matches!(err, LookupError::Rules { portal: "broken", .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(PortalRules::from_json("typo", r#"{"movments": []}"#).is_err());
    }
}
