// Backend adapter trait and failure policy.
//
// Every adapter turns image bytes into a CommonResult. What differs is how
// they react when their backend breaks: the paid APIs fail the request, the
// scraper shrugs and returns an empty result. That choice is declared through
// `failure_policy` so the dispatcher applies it in one place.

use async_trait::async_trait;
use tracing::warn;

use crate::dispatch::{Credentials, Method};
use crate::error::ScanError;
use crate::result::CommonResult;

/// How an adapter's failures reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Every error propagates.
    FailFast,
    /// Recoverable errors (see `ScanError::is_recoverable`) become an empty
    /// successful result. Everything else still propagates.
    BestEffort,
}

impl FailurePolicy {
    /// Apply this policy to an adapter outcome.
    pub fn apply(
        self,
        method_name: &str,
        outcome: Result<CommonResult, ScanError>,
    ) -> Result<CommonResult, ScanError> {
        match (self, outcome) {
            (Self::BestEffort, Err(e)) if e.is_recoverable() => {
                warn!(method = method_name, error = %e, "Backend failed, returning empty result");
                Ok(CommonResult::empty(method_name))
            }
            (_, outcome) => outcome,
        }
    }
}

/// One reverse-image-search backend, normalized.
#[async_trait]
pub trait ScanAdapter: Send + Sync {
    fn method(&self) -> Method;

    /// Display name reported in `CommonResult::method`.
    fn display_name(&self) -> &'static str;

    fn failure_policy(&self) -> FailurePolicy;

    /// Run the backend and normalize its output.
    async fn scan(&self, image: &[u8], credentials: &Credentials) -> Result<CommonResult, ScanError>;
}
