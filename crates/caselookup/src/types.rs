//! Record types shared by the adapters, the extraction engine and the merge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a partial record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// CNJ DataJud structured API.
    Datajud,
    /// e-SAJ public lookup portal.
    Esaj,
    /// eproc public lookup portal.
    Eproc,
}

impl Origin {
    pub const ALL: [Origin; 3] = [Origin::Datajud, Origin::Esaj, Origin::Eproc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Datajud => "datajud",
            Origin::Esaj => "esaj",
            Origin::Eproc => "eproc",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Procedural stage of the case (grau).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instance {
    First,
    Second,
}

impl Instance {
    pub const BOTH: [Instance; 2] = [Instance::First, Instance::Second];

    pub fn ordinal(&self) -> u8 {
        match self {
            Instance::First => 1,
            Instance::Second => 2,
        }
    }
}

/// One source/instance combination. The structured API is queried once per
/// case and is always keyed as first instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
    pub origin: Origin,
    pub instance: Instance,
}

impl SourceKey {
    pub const DATAJUD: SourceKey = SourceKey::new(Origin::Datajud, Instance::First);
    pub const ESAJ_G1: SourceKey = SourceKey::new(Origin::Esaj, Instance::First);
    pub const ESAJ_G2: SourceKey = SourceKey::new(Origin::Esaj, Instance::Second);
    pub const EPROC_G1: SourceKey = SourceKey::new(Origin::Eproc, Instance::First);
    pub const EPROC_G2: SourceKey = SourceKey::new(Origin::Eproc, Instance::Second);

    /// Every combination the merge knows about.
    pub const ALL: [SourceKey; 5] = [
        SourceKey::DATAJUD,
        SourceKey::ESAJ_G1,
        SourceKey::ESAJ_G2,
        SourceKey::EPROC_G1,
        SourceKey::EPROC_G2,
    ];

    pub const fn new(origin: Origin, instance: Instance) -> Self {
        Self { origin, instance }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::Datajud => f.write_str("datajud"),
            origin => write!(f, "{origin}:g{}", self.instance.ordinal()),
        }
    }
}

// Serialized as its display string so it can key JSON maps.
impl Serialize for SourceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A lawyer representing a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lawyer {
    pub name: String,
    /// Bar registration (e.g. `OAB SP123456`); empty when not parsed.
    #[serde(default)]
    pub registration: String,
}

/// A party to the case with its counsel, in extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Role as printed by the source (e.g. `Reqte`, `AUTOR`).
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub lawyers: Vec<Lawyer>,
}

/// A timeline event. `date` is kept as sourced and may not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEvent {
    pub date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
    pub source: Origin,
}

/// Classification fields. `None` means the source did not carry the field;
/// extractors never store empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deciding_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Names of the classification fields, used by the extraction rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Class,
    Area,
    Subject,
    DistributionDate,
    Judge,
    Value,
    DecidingBody,
    Status,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Class,
        Field::Area,
        Field::Subject,
        Field::DistributionDate,
        Field::Judge,
        Field::Value,
        Field::DecidingBody,
        Field::Status,
    ];
}

impl CaseDetails {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Store a value; blank values are dropped so `None` stays the only
    /// representation of an absent field.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        *self.slot_mut(field) = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Class => &self.class,
            Field::Area => &self.area,
            Field::Subject => &self.subject,
            Field::DistributionDate => &self.distribution_date,
            Field::Judge => &self.judge,
            Field::Value => &self.value,
            Field::DecidingBody => &self.deciding_body,
            Field::Status => &self.status,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Class => &mut self.class,
            Field::Area => &mut self.area,
            Field::Subject => &mut self.subject,
            Field::DistributionDate => &mut self.distribution_date,
            Field::Judge => &mut self.judge,
            Field::Value => &mut self.value,
            Field::DecidingBody => &mut self.deciding_body,
            Field::Status => &mut self.status,
        }
    }
}

/// What one source/instance returned for the case.
///
/// Never constructed empty by the extractors: a source with no fields, no
/// parties and no movements reports "no record" instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub key: SourceKey,
    pub details: CaseDetails,
    pub parties: Vec<Party>,
    pub movements: Vec<MovementEvent>,
}

impl SourceRecord {
    pub fn new(key: SourceKey) -> Self {
        Self {
            key,
            details: CaseDetails::default(),
            parties: Vec::new(),
            movements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty() && self.parties.is_empty() && self.movements.is_empty()
    }

    /// `Some(self)` unless the record carries nothing.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Second-instance section of the unified record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondInstanceRecord {
    pub details: CaseDetails,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub movements: Vec<MovementEvent>,
}

/// The merged view of every partial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedCaseRecord {
    pub details: CaseDetails,
    pub parties: Vec<Party>,
    pub movements: Vec<MovementEvent>,
    /// Which source/instance the movement list was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movements_from: Option<SourceKey>,
    /// One flag per source/instance: did it produce any data.
    pub provenance: std::collections::BTreeMap<SourceKey, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_instance: Option<SecondInstanceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_display() {
        assert_eq!(SourceKey::DATAJUD.to_string(), "datajud");
        assert_eq!(SourceKey::ESAJ_G2.to_string(), "esaj:g2");
        assert_eq!(SourceKey::EPROC_G1.to_string(), "eproc:g1");
    }

    #[test]
    fn test_details_set_drops_blank() {
        let mut d = CaseDetails::default();
        d.set(Field::Class, "   ");
        assert!(d.class.is_none());
        d.set(Field::Class, " Procedimento Comum ");
        assert_eq!(d.get(Field::Class), Some("Procedimento Comum"));
        assert!(!d.is_empty());
    }

    #[test]
    fn test_empty_record_is_rejected() {
        let record = SourceRecord::new(SourceKey::ESAJ_G1);
        assert!(record.is_empty());
        assert!(record.non_empty().is_none());
    }

    #[test]
    fn test_source_key_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(SourceKey::ESAJ_G1, true);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"esaj:g1":true}"#);
    }
}
