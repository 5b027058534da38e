//! Core types shared by the reference tracking components.
//!
//! This crate provides the vocabulary used by tiered references, reclamation
//! queues and collectors.
//!
//! # Overview
//!
//! - [`ReachabilityTier`] - Declared tier of a tiered reference
//! - [`Reachability`] - Observed reachability of a target
//! - [`ReferenceId`] - Identity of a tiered reference
//! - [`ReclaimError`] - Failures of blocking waits and collector startup
//!
//! # Examples
//!
//! ```
//! use core_types::{Reachability, ReachabilityTier, ReferenceId};
//!
//! let tier = ReachabilityTier::Phantom;
//! assert!(!tier.allows_retrieval());
//! assert!(tier.is_eligible(Reachability::Unreachable));
//!
//! let id = ReferenceId::next();
//! assert!(id.to_string().starts_with("ref#"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod id;
mod tier;

pub use error::{ReclaimError, ReclaimResult};
pub use id::ReferenceId;
pub use tier::{Reachability, ReachabilityTier};
