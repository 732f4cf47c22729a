//! CSTI scanner - browser-driven Client-Side Template Injection detection
//!
//! Drives a real browser page, fingerprints the client-side template engine,
//! injects engine-specific payloads into forms, inputs, buttons and links,
//! and reports pages where the payload comes back evaluated.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod engines;
pub mod error;
pub mod models;
pub mod scanner;
