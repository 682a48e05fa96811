//! talkcut - segment selection and normalization for subtitle transcripts
//!
//! A transcript is parsed into timed units, a pluggable
//! [`oracle::SelectionOracle`] proposes spans worth keeping, and the
//! [`normalize`] pass turns those proposals into ordered, gap-respecting
//! segments. The result is checked against a compression target and written
//! as the segment table a cutting tool consumes.

pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod table;
pub mod time;
pub mod transcript;
pub mod types;
pub mod workdir;

pub use error::{Error, OracleError, Result};
