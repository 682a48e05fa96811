//! Selection oracle - the pluggable judgment of which spans are worth keeping
//!
//! The engine never decides value itself. An oracle receives the whole
//! transcript and answers with candidate spans, each expected to cover a
//! complete thought. That expectation is a precondition: the normalizer only
//! enforces structure.

mod command;
mod table;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{OracleError, Result};
use crate::types::{SegmentCandidate, Transcript};

pub use command::CommandOracle;
pub use table::TableOracle;

#[async_trait]
pub trait SelectionOracle: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// One atomic request: either every candidate or an error.
    async fn select(
        &self,
        transcript: &Transcript,
    ) -> std::result::Result<Vec<SegmentCandidate>, OracleError>;
}

/// A fixed, human-curated list.
#[async_trait]
impl SelectionOracle for Vec<SegmentCandidate> {
    fn name(&self) -> &str {
        "list"
    }

    async fn select(
        &self,
        _transcript: &Transcript,
    ) -> std::result::Result<Vec<SegmentCandidate>, OracleError> {
        Ok(self.clone())
    }
}

/// Run the oracle once, racing it against `timeout` and `cancel`.
///
/// Nothing is retried and no partial answer is kept: on timeout,
/// cancellation or oracle failure the error is returned as
/// [`crate::Error::OracleUnavailable`].
pub async fn select_candidates(
    oracle: &dyn SelectionOracle,
    transcript: &Transcript,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Vec<SegmentCandidate>> {
    info!(
        oracle = oracle.name(),
        units = transcript.len(),
        "requesting segment selection"
    );

    let answer = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OracleError::Cancelled),
        answer = with_deadline(oracle.select(transcript), timeout) => answer,
    };

    match answer {
        Ok(candidates) => {
            info!(
                oracle = oracle.name(),
                candidates = candidates.len(),
                "selection finished"
            );
            Ok(candidates)
        }
        Err(err) => {
            warn!(oracle = oracle.name(), error = %err, "selection failed");
            Err(err.into())
        }
    }
}

async fn with_deadline<F>(
    request: F,
    timeout: Option<Duration>,
) -> std::result::Result<Vec<SegmentCandidate>, OracleError>
where
    F: Future<Output = std::result::Result<Vec<SegmentCandidate>, OracleError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .unwrap_or(Err(OracleError::TimedOut(limit))),
        None => request.await,
    }
}
