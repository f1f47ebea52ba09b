//! Court alias registry for the DataJud structured API.
//!
//! DataJud exposes one index per court (`api_publica_tjsp`, ...). The table
//! below is the only place court codes live; it is turned into an immutable
//! [`CourtRegistry`] once and shared by reference across concurrent lookups.

use crate::error::LookupError;
use crate::identifier::CaseIdentifier;
use std::collections::HashMap;

/// `(alias, judicial segment, court number)`
const BUILTIN_COURTS: &[(&str, &str, &str)] = &[
    // Superior courts
    ("stj", "3", "00"),
    ("tst", "5", "00"),
    // Federal regional courts
    ("trf1", "4", "01"),
    ("trf2", "4", "02"),
    ("trf3", "4", "03"),
    ("trf4", "4", "04"),
    ("trf5", "4", "05"),
    ("trf6", "4", "06"),
    // Labor regional courts
    ("trt1", "5", "01"),
    ("trt2", "5", "02"),
    ("trt3", "5", "03"),
    ("trt4", "5", "04"),
    ("trt5", "5", "05"),
    ("trt6", "5", "06"),
    ("trt7", "5", "07"),
    ("trt8", "5", "08"),
    ("trt9", "5", "09"),
    ("trt10", "5", "10"),
    ("trt11", "5", "11"),
    ("trt12", "5", "12"),
    ("trt13", "5", "13"),
    ("trt14", "5", "14"),
    ("trt15", "5", "15"),
    ("trt16", "5", "16"),
    ("trt17", "5", "17"),
    ("trt18", "5", "18"),
    ("trt19", "5", "19"),
    ("trt20", "5", "20"),
    ("trt21", "5", "21"),
    ("trt22", "5", "22"),
    ("trt23", "5", "23"),
    ("trt24", "5", "24"),
    // State courts
    ("tjac", "8", "01"),
    ("tjal", "8", "02"),
    ("tjap", "8", "03"),
    ("tjam", "8", "04"),
    ("tjba", "8", "05"),
    ("tjce", "8", "06"),
    ("tjdft", "8", "07"),
    ("tjes", "8", "08"),
    ("tjgo", "8", "09"),
    ("tjma", "8", "10"),
    ("tjmt", "8", "11"),
    ("tjms", "8", "12"),
    ("tjmg", "8", "13"),
    ("tjpa", "8", "14"),
    ("tjpb", "8", "15"),
    ("tjpr", "8", "16"),
    ("tjpe", "8", "17"),
    ("tjpi", "8", "18"),
    ("tjrj", "8", "19"),
    ("tjrn", "8", "20"),
    ("tjrs", "8", "21"),
    ("tjro", "8", "22"),
    ("tjrr", "8", "23"),
    ("tjsc", "8", "24"),
    ("tjse", "8", "25"),
    ("tjsp", "8", "26"),
    ("tjto", "8", "27"),
];

/// Immutable alias → index lookup.
#[derive(Debug, Clone)]
pub struct CourtRegistry {
    indexes: HashMap<String, String>,
    by_code: HashMap<(String, String), String>,
}

impl CourtRegistry {
    /// Registry with every court DataJud publishes.
    pub fn builtin() -> Self {
        let mut indexes = HashMap::with_capacity(BUILTIN_COURTS.len());
        let mut by_code = HashMap::with_capacity(BUILTIN_COURTS.len());
        for (alias, segment, court) in BUILTIN_COURTS {
            indexes.insert(alias.to_string(), format!("api_publica_{alias}"));
            by_code.insert((segment.to_string(), court.to_string()), alias.to_string());
        }
        Self { indexes, by_code }
    }

    /// DataJud index name for a court alias (case-insensitive).
    pub fn index_for(&self, alias: &str) -> Result<&str, LookupError> {
        self.indexes
            .get(&alias.trim().to_ascii_lowercase())
            .map(String::as_str)
            .ok_or_else(|| LookupError::UnknownCourt(alias.to_string()))
    }

    /// Court alias encoded in an identifier's segment and court digits.
    pub fn alias_for(&self, id: &CaseIdentifier) -> Result<&str, LookupError> {
        self.by_code
            .get(&(id.segment().to_string(), id.court().to_string()))
            .map(String::as_str)
            .ok_or_else(|| LookupError::UnknownCourt(format!("{}.{}", id.segment(), id.court())))
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
