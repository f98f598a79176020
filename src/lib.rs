//! Purpose: Library crate behind the `summary-desk` binary and its tests.
//! Exports: `core` (records, validation, storage, errors), `api` (query surface,
//! wire protocol, remote client), `manager` (client-side orchestrator).
//! Role: The binary is a thin presenting layer over these modules.
//! Invariants: The document store is the only source of truth for records.
//! Invariants: Client-side validation failures never produce a network call.
pub mod api;
pub mod core;
pub mod manager;
