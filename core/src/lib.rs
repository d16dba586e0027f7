//! Annotation-synchronization core of the Lectio reader.
//!
//! Lets a user highlight and annotate verses, keeps those annotations
//! consistent across text editions whose verse numbering does not align
//! one-to-one, and keeps the device and the remote store eventually
//! consistent across unreliable connectivity.
//!
//! Reads flow one way (remote -> cache -> store -> presentation) and writes
//! flow one way (presentation -> store -> outbox -> remote), with the outbox
//! read back to keep the record-id index current.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod alignment;
pub mod config;
pub mod domain;
pub mod infra;
pub mod session;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use alignment::{AlignmentError, AlignmentTable, ClusterResolver};
pub use config::CoreConfig;
pub use domain::{
	Annotation, AnnotationKey, BookId, ClusterId, EditionId, HighlightColor, RecordId,
	RecordPatch, RemoteRecord, VerseKey, VerseRef,
};
pub use infra::{
	Catalog, ConnectionState, Connectivity, Identity, RemoteAnnotationApi, RemoteApiError,
	TextError, TextRepository, UserId,
};
pub use session::{ReaderSession, SessionError};
pub use store::{AnnotationStore, EditAction, EditOutcome, RemoteIdIndex};
pub use sync::{CurrentView, SyncClient, SyncEvent, SyncOrchestrator};
