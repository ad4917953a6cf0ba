//! # MTM Common Library
//!
//! Shared code for the Music Tag Manager pipeline components including:
//! - Wire data model (albums, tracks, candidate releases)
//! - Event types (MtmEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{Album, AlbumStatus, CandidateRelease, Track};
