//! workerlab-core: Run coordination, request synthesis, and verdicts.
//!
//! This crate defines the data model, the isolation substrate seam, and the
//! pipeline that turns a submission plus test cases into verdicts. The
//! concrete sandbox lives in `workerlab-sandbox`.

pub mod coordinator;
pub mod error;
pub mod ids;
pub mod invoker;
pub mod mock;
pub mod model;
pub mod parser;
pub mod provision;
pub mod synth;
pub mod traits;
pub mod verdict;
