//! Deterministic merge of partial records into one unified record.
//!
//! Every field group has a fixed candidate order and the first source with a
//! value wins, so arrival order of the concurrent fetches never matters:
//!
//! | group                                             | order                                  |
//! |---------------------------------------------------|----------------------------------------|
//! | class, area, subject, deciding body, distribution | datajud, esaj:g1, eproc:g1             |
//! | judge, value, status                              | esaj:g1, eproc:g1                      |
//! | parties                                           | esaj:g1, eproc:g1, esaj:g2, eproc:g2   |
//! | movements                                         | datajud (sorted), esaj:g1, eproc:g1    |
//! | second instance                                   | esaj:g2, eproc:g2                      |

use crate::extraction::parse_event_date;
use crate::types::{
    CaseDetails, Field, MovementEvent, SecondInstanceRecord, SourceKey, SourceRecord,
    UnifiedCaseRecord,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

const IDENTITY_FIELDS: [Field; 5] = [
    Field::Class,
    Field::Area,
    Field::Subject,
    Field::DecidingBody,
    Field::DistributionDate,
];
const IDENTITY_ORDER: [SourceKey; 3] = [SourceKey::DATAJUD, SourceKey::ESAJ_G1, SourceKey::EPROC_G1];

/// Fields the structured API never carries.
const PORTAL_ONLY_FIELDS: [Field; 3] = [Field::Judge, Field::Value, Field::Status];
const PORTAL_ORDER: [SourceKey; 2] = [SourceKey::ESAJ_G1, SourceKey::EPROC_G1];

const PARTY_ORDER: [SourceKey; 4] = [
    SourceKey::ESAJ_G1,
    SourceKey::EPROC_G1,
    SourceKey::ESAJ_G2,
    SourceKey::EPROC_G2,
];
const SECOND_INSTANCE_ORDER: [SourceKey; 2] = [SourceKey::ESAJ_G2, SourceKey::EPROC_G2];

/// Partial records keyed by source/instance. Absent keys had no record.
pub type PartialRecords = BTreeMap<SourceKey, SourceRecord>;

/// Merge up to five partial records.
pub fn merge(records: &PartialRecords) -> UnifiedCaseRecord {
    let mut details = CaseDetails::default();
    fill(&mut details, records, &IDENTITY_FIELDS, &IDENTITY_ORDER);
    fill(&mut details, records, &PORTAL_ONLY_FIELDS, &PORTAL_ORDER);

    let parties = PARTY_ORDER
        .iter()
        .filter_map(|key| records.get(key))
        .map(|r| &r.parties)
        .find(|p| !p.is_empty())
        .cloned()
        .unwrap_or_default();

    let (movements, movements_from) = merge_movements(records);

    let provenance = SourceKey::ALL
        .iter()
        .map(|key| (*key, records.get(key).is_some_and(|r| !r.is_empty())))
        .collect();

    UnifiedCaseRecord {
        details,
        parties,
        movements,
        movements_from,
        provenance,
        second_instance: second_instance(records),
    }
}

fn fill(details: &mut CaseDetails, records: &PartialRecords, fields: &[Field], order: &[SourceKey]) {
    for field in fields {
        let value = order
            .iter()
            .filter_map(|key| records.get(key))
            .find_map(|r| r.details.get(*field));
        if let Some(value) = value {
            details.set(*field, value);
        }
    }
}

fn merge_movements(records: &PartialRecords) -> (Vec<MovementEvent>, Option<SourceKey>) {
    if let Some(api) = records.get(&SourceKey::DATAJUD).filter(|r| !r.movements.is_empty()) {
        let mut movements = api.movements.clone();
        sort_newest_first(&mut movements);
        return (movements, Some(SourceKey::DATAJUD));
    }
    // Portal timelines are kept as scraped.
    PORTAL_ORDER
        .iter()
        .filter_map(|key| records.get(key).map(|r| (key, r)))
        .find(|(_, r)| !r.movements.is_empty())
        .map(|(key, r)| (r.movements.clone(), Some(*key)))
        .unwrap_or_default()
}

/// Sort by parsed date, newest first. Events whose date does not parse go
/// after every dated event, keeping their original relative order.
pub fn sort_newest_first(movements: &mut [MovementEvent]) {
    let mut keyed: Vec<_> = movements
        .iter()
        .cloned()
        .map(|m| (parse_event_date(&m.date), m))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    for (slot, (_, m)) in movements.iter_mut().zip(keyed) {
        *slot = m;
    }
}

fn second_instance(records: &PartialRecords) -> Option<SecondInstanceRecord> {
    let candidates: Vec<&SourceRecord> = SECOND_INSTANCE_ORDER
        .iter()
        .filter_map(|key| records.get(key))
        .collect();
    if candidates.iter().all(|r| r.details.is_empty()) {
        return None;
    }

    let mut details = CaseDetails::default();
    for field in Field::ALL {
        if let Some(value) = candidates.iter().find_map(|r| r.details.get(field)) {
            details.set(field, value);
        }
    }
    let movements = candidates
        .iter()
        .map(|r| &r.movements)
        .find(|m| !m.is_empty())
        .cloned()
        .unwrap_or_default();
    Some(SecondInstanceRecord { details, movements })
}
