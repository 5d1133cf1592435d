// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! Core library for flowforge: synthesizes Twilio Studio flow definitions
//! from the functions deployed to a Serverless service, and publishes them
//! through a validate-then-publish pipeline.
//!
//! Layering follows the usual split: `domain` holds the flow graph model
//! and parameter source, `application` the pure synthesizer and the
//! deployment pipeline over abstract ports, `infrastructure` the concrete
//! Twilio API clients behind those ports.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
