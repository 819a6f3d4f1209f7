//! Agent System
//!
//! Agents talk to the model on behalf of the user.
//!
//! ```text
//! Uploaded file ──► Extractor ──► document text ─┐
//!                                                ├──► Query Agent ──► answer
//! User instruction ──────────────────────────────┘
//! ```
//!
//! - **Query Agent**: sends the document text and the instruction as two user
//!   turns and gathers the streamed reply

pub mod query;

pub use query::QueryAgent;
