// Scan error taxonomy.
//
// A closed set of failure kinds so callers match on each one instead of
// catching a generic error. Collaborator clients report anyhow errors; the
// adapters translate them into one of these variants.

use std::time::Duration;

/// Everything that can stop a scan from producing a `CommonResult`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    /// A credential required by the selected method is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The image host failed or was unreachable.
    #[error("image upload failed: {0}")]
    Upload(String),

    /// The backend reported an explicit error. The message is passed through verbatim.
    #[error("{0}")]
    Upstream(String),

    /// The method selector does not name a known backend.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// Browser automation or page extraction failed.
    #[error("browser automation failed: {0}")]
    Automation(String),

    /// The scan did not finish within the request deadline.
    #[error("scan timed out after {0:?}")]
    Timeout(Duration),
}

impl ScanError {
    /// Whether a best-effort adapter may swallow this error and return an
    /// empty result instead.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Automation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_verbatim() {
        let err = ScanError::Upstream("quota exceeded".into());
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn display_configuration() {
        let err = ScanError::Configuration("IMGBB_KEY not set".into());
        assert_eq!(err.to_string(), "configuration error: IMGBB_KEY not set");
    }

    #[test]
    fn timeout_reports_sub_second_deadlines() {
        assert_eq!(
            ScanError::Timeout(Duration::from_millis(500)).to_string(),
            "scan timed out after 500ms"
        );
        assert_eq!(
            ScanError::Timeout(Duration::from_secs(60)).to_string(),
            "scan timed out after 60s"
        );
    }

    #[test]
    fn only_automation_is_recoverable() {
        assert!(ScanError::Automation("driver gone".into()).is_recoverable());
        assert!(!ScanError::Upload("no url".into()).is_recoverable());
        assert!(!ScanError::Upstream("bad".into()).is_recoverable());
        assert!(!ScanError::Timeout(Duration::from_secs(60)).is_recoverable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScanError>();
    }
}
