//! Purpose: Define the public query surface, wire protocol, and clients.
//! Exports: `SummaryService`, `RemoteClient`, `SummaryApi`, protocol envelopes, errors.
//! Role: Stable boundary used by the server, the CLI, and the orchestrator.
//! Invariants: This module is the only public path to the query operations.
//! Invariants: Storage is reached through `core::store::DocumentStore` only.

mod access;
pub mod protocol;
mod remote;
mod service;

pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::record::{Summary, SummaryInput};
pub use crate::core::store::{DocumentStore, FileCollection, Filter, MemoryCollection, open_store};
pub use access::SummaryApi;
pub use protocol::Operation;
pub use remote::RemoteClient;
pub use service::{Clock, SummaryService};
