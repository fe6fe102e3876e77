//! Terminal finder for Paris public toilets.
//!
//! [`map::MapController`] is the core: it acquires the device position and the
//! open-data facility list concurrently, tracks which facility is inspected,
//! and runs the report modal. The rest is plumbing around it.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod location;
pub mod logging;
pub mod map;
pub mod models;
pub mod mount;
pub mod normalize;
pub mod report;
pub mod state;
pub mod ui;
