//! Disposable Postgres for store tests, started through testcontainers.

pub mod postgres;
pub mod runtime;
