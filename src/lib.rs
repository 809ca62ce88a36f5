//! Affinity Stealth Adder Library
//!
//! Turns a scraped LinkedIn profile or company website into Affinity records:
//! creates or reuses the organization and person, links them, files the
//! result on a tracking list with owner, status and note, and offers a
//! duplicate pre-check.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core reconciliation logic.
//! - `integrations`: External service integrations.
//! - `affinity_client`: Affinity REST client.
//! - `config`: Configuration management.
//! - `diagnostics`: Collection of best-effort step failures.
//! - `duplicates`: Duplicate pre-check.
//! - `entities`: Organization/person creation, dedup and linking.
//! - `errors`: Error handling types.
//! - `fields`: List field discovery, owner and status assignment.
//! - `handlers`: HTTP request handlers.
//! - `identity`: Operator resolution.
//! - `models`: Caller and Affinity data models.
//! - `notes`: Note attachment.
//! - `pipeline`: The reconciliation engine.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod affinity_client;
pub mod config;
pub mod diagnostics;
pub mod duplicates;
pub mod entities;
pub mod errors;
pub mod fields;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notes;
pub mod pipeline;
