//! MuPDF view worker library.
//!
//! A line-delimited JSON worker that keeps one document open at a time and
//! answers viewing calls (page sizes, links, text, search, annotations,
//! rendering) by delegating to MuPDF.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ops;
pub mod protocol;
pub mod remote;
pub mod session;
pub mod worker;

pub use config::Config;
pub use engine::{DocumentEngine, EngineDocument, MupdfEngine};
pub use error::{Result, WorkerError};
pub use protocol::{Call, Envelope, Reply};
pub use remote::RangeFetcher;
pub use session::Session;
pub use worker::{run, Outcome, Worker};
