//! Directory service layer.
//!
//! This module sits between the HTTP handlers and the persistence/storage
//! backends:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            DirectoryService             │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ UserProfile  │  │ inspect_image   │  │
//! │  │ (age, follow │  │ (sniff format,  │  │
//! │  │  counts)     │  │  check size)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └──────────┬─────────────────────┬────────┘
//!            │                     │
//!            ▼                     ▼
//! ┌───────────────────┐  ┌───────────────────┐
//! │     Directory     │  │    ObjectStore    │
//! └───────────────────┘  └───────────────────┘
//! ```
//!
//! # Components
//!
//! - [`DirectoryService`]: Entry point for every operation exposed over HTTP
//! - [`UserProfile`]: A user record shaped for responses (age, follow counts)
//! - [`inspect_image`]: Validates uploaded profile images

mod profile;
mod service;
mod upload;

pub use profile::{age_on, today, UserProfile};
pub use service::{DependencyStatus, DirectoryService, ProfileImage, Readiness};
pub use upload::{
    inspect_image, ImageInfo, ImageKind, DEFAULT_MAX_UPLOAD_BYTES, MAX_IMAGE_DIMENSION,
};
