//! HTTP collaborators consumed by the reactor.
//!
//! The reactor only needs a narrow view of HTTP:
//!
//! - **`parser`**: [`RequestParser`](parser::RequestParser), the per-exchange
//!   request accumulator (feed bytes, ask whether a request is complete or broken)
//! - **`request`**: the parsed request handed to the application
//! - **`response`**: the application's answer, including whether to disconnect
//! - **`writer`**: serializes a response and writes it out across partial writes
//!
//! # Exchange lifecycle
//!
//! ```text
//!        ┌─────────────┐
//!        │  Receiving  │ ← bytes fed to a fresh RequestParser
//!        └──────┬──────┘
//!               │ request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Handler::on_request
//!        └──────┬───────────┘
//!               │ Some(response)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← ResponseWriter
//!        └──────┬───────────┘
//!               │ response sent
//!               ├─ keep open → Receiving (same connection)
//!               └─ disconnect → connection removed
//! ```
//!
//! A parse error at any point removes the connection.

pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
