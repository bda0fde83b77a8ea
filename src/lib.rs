//! Crowdin Sync - translation bridge between a structured content store and Crowdin
//!
//! Editors send documents out for translation from the studio; Crowdin webhooks bring
//! approved and in-progress translations back as localized documents and previews.

pub mod adapter;
pub mod bridge;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod ids;
pub mod langs;
pub mod server;
pub mod store;
pub mod vendor;
