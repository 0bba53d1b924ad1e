//! Summarize a GitHub user's activity events into per-repository pull
//! requests and issues.
//!
//! Raw events go through [`events::decode_events`], which keeps every event it
//! can decode, and are then folded by [`activity::aggregate`] into an
//! [`activity::ActivityReport`] that [`report`] renders.

pub mod activity;
pub mod config;
pub mod events;
pub mod github;
pub mod report;
