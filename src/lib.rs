//! Purpose: Shared library crate used by the `taxon` CLI and tests.
//! Exports: `core` (records, filters, sources, formatter, errors), `api`, `notice`.
//! Role: Library backing the binary; the formatter and sources are reusable on their own.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: Record sources are injected; nothing reaches for a global registry.
pub mod api;
pub mod core;
pub mod notice;
