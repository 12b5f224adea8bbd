//! voice-morph - Record your voice and restyle it with AI
//!
//! This crate provides the core functionality for capturing microphone audio
//! through a pausable recording session and transforming the result into a
//! different voice style via a remote restyling service.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Core business logic, value objects, entities, and errors
//! - **Application**: Use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (capture backends, HTTP provider, config)
//! - **CLI**: Command-line interface and argument parsing

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
