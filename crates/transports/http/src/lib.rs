//! HTTP transport for the ASR load generator
//!
//! Implements [`RecognitionService`](asr_loadgen_core::RecognitionService)
//! over the service's JSON/HTTP API.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use asr_loadgen_core::LoadGenConfig;
//! use asr_loadgen_http::HttpRecognitionClient;
//!
//! let config = LoadGenConfig::load(None)?;
//! let service = Arc::new(HttpRecognitionClient::from_config(&config)?);
//! ```

pub mod client;
pub mod error;

// Re-export main types
pub use client::{ClientOptions, HttpRecognitionClient};
pub use error::{Error, Result};
