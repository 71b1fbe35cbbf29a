//! # `LaminarDB` Kafka Table
//!
//! Resolution of Kafka table definitions for `LaminarDB`.
//!
//! A table is declared with a schema and a flat `WITH (...)` option map. This
//! crate validates that declaration and turns it into an immutable source or
//! sink description that a Kafka reader or writer can run from.
//!
//! - [`config`] - Typed option access (`TableOptions`, `ConfigOption`)
//! - [`schema`] - Resolved table schemas
//! - [`format`] - Serialization format capability (`FormatFactory`)
//! - [`registry`] - Format provider lookup
//! - [`kafka`] - The Kafka table factory and its resolvers
//! - [`testing`] - Test format provider and fixtures
//!
//! ## Resolution
//!
//! ```text
//! ResolvedTable { identifier, schema, options }
//!   -> option validation -> format discovery -> path settings
//!   -> projections + metadata
//!   -> SourceSpec | SinkSpec
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Common test patterns that are acceptable
#![cfg_attr(
    test,
    allow(
        clippy::field_reassign_with_default,
        clippy::float_cmp,
        clippy::manual_let_else,
        clippy::needless_return,
        clippy::unreadable_literal,
        clippy::approx_constant,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::unchecked_time_subtraction,
        clippy::no_effect_underscore_binding,
        unused_mut
    )
)]

// ── Table model ──

/// Connector error types.
pub mod error;

/// Table option types.
pub mod config;

/// Resolved table schemas.
pub mod schema;

// ── Formats ──

/// Serialization format capability.
pub mod format;

/// Format provider registry.
pub mod registry;

// ── Connectors ──

/// Kafka table connector.
pub mod kafka;

/// Testing utilities (test format, fixtures).
pub mod testing;

pub use error::{ConnectorError, SerdeError};
pub use kafka::{KafkaTableFactory, SinkSpec, SourceSpec};
pub use schema::ResolvedTable;
