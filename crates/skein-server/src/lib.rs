//! # skein-server
//!
//! The mutation-serialization and broadcast pipeline.
//!
//! Many connections submit mutations concurrently; every one of them passes
//! through a single-consumer serializer that exclusively owns the Document,
//! persists a full snapshot per accepted mutation, records a best-effort
//! audit commit, and fans the outcome back out to every live session.
//!
//! ## Data flow
//!
//! ```text
//! session → serializer → (apply) → durable writer → audit sink (best-effort)
//!                                        │
//!                                        └→ fan-out → every session
//! ```
//!
//! Transport framing stays out of this crate's way: a session is driven over
//! any buffered line stream, and the listener only sniffs the first line to
//! tell a one-shot snapshot request from a persistent channel.

pub mod audit;
pub mod fanout;
pub mod http;
pub mod protocol;
pub mod serializer;
pub mod server;
pub mod session;
pub mod writer;

pub use serializer::{Mutation, Outcome, Rejection, SerializerHandle};
pub use server::{DEFAULT_PORT_ATTEMPTS, ServeError, Server, ServerConfig, run};
