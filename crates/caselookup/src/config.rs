//! Lookup configuration: endpoints and retry budgets per source.
//!
//! The core only defines the shape and production defaults; resolving
//! overrides (flags, environment) belongs to the caller.

use crate::acquisition::RetryPolicy;
use crate::types::Instance;
use serde::{Deserialize, Serialize};

/// Public DataJud API key published by CNJ for anonymous access.
pub const DATAJUD_PUBLIC_KEY: &str =
    "cDZHYzlZa0JadVREZDJCendQbXY6SkJlTzNjLV9TRENyQk1RdnFKZGRQdw==";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatajudConfig {
    /// Base URL; the court index and `/_search` are appended.
    pub base_url: String,
    pub api_key: String,
    pub retry: RetryPolicy,
}

impl Default for DatajudConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-publica.datajud.cnj.jus.br".to_string(),
            api_key: DATAJUD_PUBLIC_KEY.to_string(),
            retry: RetryPolicy::api(),
        }
    }
}

/// Endpoints of one portal, one deployment per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub first_instance: String,
    pub second_instance: String,
    pub retry: RetryPolicy,
}

impl PortalConfig {
    pub fn base_for(&self, instance: Instance) -> &str {
        match instance {
            Instance::First => &self.first_instance,
            Instance::Second => &self.second_instance,
        }
    }

    pub fn esaj_default() -> Self {
        Self {
            first_instance: "https://esaj.tjsp.jus.br/cpopg".to_string(),
            second_instance: "https://esaj.tjsp.jus.br/cposg".to_string(),
            retry: RetryPolicy::portal(),
        }
    }

    pub fn eproc_default() -> Self {
        Self {
            first_instance: "https://eproc1g.tjrs.jus.br/eproc".to_string(),
            second_instance: "https://eproc2g.tjrs.jus.br/eproc".to_string(),
            retry: RetryPolicy::portal(),
        }
    }
}

/// Everything needed to build the default set of sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub datajud: DatajudConfig,
    pub esaj: PortalConfig,
    pub eproc: PortalConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            datajud: DatajudConfig::default(),
            esaj: PortalConfig::esaj_default(),
            eproc: PortalConfig::eproc_default(),
        }
    }
}
