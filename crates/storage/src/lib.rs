// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the rollback orchestrator.
//!
//! - [`PointStore`]: durable catalog of rollback points and executions,
//!   one JSON file per environment.
//! - [`ArtifactStore`]: compressed, checksummed snapshot artifacts
//!   addressed by locator.

mod artifacts;
mod catalog;
mod listing;
mod store;

pub use artifacts::{sha256_hex, ArtifactError, ArtifactId, ArtifactStore, StoredArtifact};
pub use catalog::{Catalog, Entry, CURRENT_CATALOG_VERSION};
pub use listing::{Listing, ListingIter};
pub use store::{PointStore, StoreError};
