//! # ebvcheck
//!
//! Ebuild version check for a portage overlay.
//!
//! Every package in the overlay is compared against the latest version known
//! to repology. Checks run concurrently under a bounded admission gate, and
//! their status lines are released to stdout in package order regardless of
//! which check finishes first.

pub mod check;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod overlay;
pub mod portage;
pub mod repology;
pub mod telemetry;
