//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into presentation-facing operations.
//! - Fan out committed mutations to live-query observers.
//! - Keep UI layers decoupled from storage details.

pub mod catalog_service;
