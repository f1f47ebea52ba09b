// Copyright 2026 Caselookup Contributors
// SPDX-License-Identifier: Apache-2.0

//! Caselookup: find a Brazilian court case by its CNJ number across the
//! DataJud public API and the e-SAJ and eproc lookup portals, and merge what
//! each one knows into a single record.
//!
//! ```no_run
//! use caselookup::{CaseLocator, LookupConfig, LookupRequest};
//!
//! # async fn run() -> Result<(), caselookup::LookupError> {
//! let locator = CaseLocator::from_config(&LookupConfig::default())?;
//! let report = locator
//!     .locate(&LookupRequest::new("1001234-56.2023.8.26.0100"))
//!     .await?;
//! println!("{:?}", report.record.details.class);
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod config;
pub mod courts;
pub mod error;
pub mod extraction;
pub mod identifier;
pub mod locator;
pub mod merge;
pub mod sources;
pub mod types;

pub use config::{DatajudConfig, LookupConfig, PortalConfig};
pub use error::{FetchError, LookupError};
pub use identifier::{CaseIdentifier, CaseQuery};
pub use locator::{CaseLocator, LookupReport, LookupRequest, SourceFailure, SourceStatus};
pub use types::{
    CaseDetails, Instance, Lawyer, MovementEvent, Origin, Party, SourceKey, SourceRecord,
    UnifiedCaseRecord,
};
