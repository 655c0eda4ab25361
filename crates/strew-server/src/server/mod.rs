//! Server-side components of the `strew-server` dispatch service.
//!
//! This module contains the building blocks necessary to run the HTTP server:
//! the route handlers, the concrete engine and HTTP client backends, and
//! configuration and telemetry setup.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/env configuration parsed into a validated
//!   `ServerConfig`.
//! - [`engine`] - The built-in feature-hashing embedding engine.
//! - [`error`] - Mapping from dispatch errors to HTTP responses.
//! - [`fetch`] - The reqwest-backed outbound HTTP dispatcher.
//! - [`service`] - Route handlers and router assembly.
//! - [`telemetry`] - Structured logging and optional metrics initialization.
//!
//! These components are wired together in the binary's `main.rs`.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod service;
pub mod telemetry;
