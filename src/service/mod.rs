//! Service layer
//!
//! Contains the pipeline's business logic: credential lifecycle,
//! status filtering, content transformation, media ingestion, and the
//! import orchestrator that ties them together.

mod credentials;
mod filter;
mod importer;
mod media;
mod transform;

pub use credentials::{CredentialService, normalize_instance_url};
pub use filter::{RejectReason, StatusFilter};
pub use importer::{ImportOutcome, ImportService};
pub use media::{IngestOutcome, MediaIngestor};
pub use transform::{DefaultHooks, ImportHooks, apply_boost_attribution, derive_title, sanitize};
