//! Hierarchical playlist ("grouplike") model.
//!
//! A playlist is a tree of named groups and tracks. This crate owns the
//! canonical representation, normalization from the legacy playlist shapes,
//! the structure-sharing query/transform operations used to derive views,
//! and the identity-keyed record store for per-entry playback status.

pub mod error;
pub mod normalize;
pub mod query;
pub mod record_store;
pub mod transform;
pub mod tree;

pub use error::TreeError;
pub use normalize::normalize;
pub use query::{Resolution, parse_path};
pub use record_store::{Record, RecordStore};
pub use tree::{NodeId, Playlist};
