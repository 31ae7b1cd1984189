//! Mock converter for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::converter::{ConversionRequest, ConvertError, Converter};

/// Mock implementation of the [`Converter`] trait.
///
/// Counts invocations so tests can prove that unsupported files never
/// reach a converter, and can be scripted to fail every conversion or
/// to take a fixed amount of time.
#[derive(Debug, Default)]
pub struct MockConverter {
    invocations: AtomicUsize,
    failure: Mutex<Option<String>>,
    delay_ms: AtomicU64,
    outputs: Mutex<Option<Vec<&'static str>>>,
}

impl MockConverter {
    /// Create a mock that accepts every output format and succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `convert` calls seen so far.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Make every subsequent conversion fail with this message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// Clear a scripted failure.
    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Make each conversion take this long.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Restrict the advertised output formats (default: accept all).
    pub fn restrict_outputs(&self, outputs: Vec<&'static str>) {
        *self.outputs.lock().unwrap() = Some(outputs);
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    fn output_formats(&self) -> &[&str] {
        // The restricted list (if any) is enforced by supports_output;
        // this advisory list is intentionally broad.
        &["pdf", "jpg", "png", "txt", "docx", "zip", "mp3", "mp4"]
    }

    fn supports_output(&self, format: &str) -> bool {
        let format = format.trim_start_matches('.').to_ascii_lowercase();
        match self.outputs.lock().unwrap().as_ref() {
            Some(outputs) => outputs.contains(&format.as_str()),
            None => true,
        }
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ConvertError::tool_failed("mock", message, None));
        }

        Ok(request.default_output_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Quality;

    #[tokio::test]
    async fn test_counts_invocations() {
        let mock = MockConverter::new();
        let request = ConversionRequest::new("/in/a.png", "/out", "jpg", Quality::Medium);

        mock.convert(&request).await.unwrap();
        mock.convert(&request).await.unwrap();
        assert_eq!(mock.invocation_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockConverter::new();
        mock.fail_with("boom");

        let request = ConversionRequest::new("/in/a.png", "/out", "jpg", Quality::Medium);
        let result = mock.convert(&request).await;
        assert!(matches!(result, Err(ConvertError::ToolFailed { .. })));
        assert_eq!(mock.invocation_count(), 1);

        mock.clear_failure();
        assert!(mock.convert(&request).await.is_ok());
    }

    #[test]
    fn test_restricted_outputs() {
        let mock = MockConverter::new();
        assert!(mock.supports_output("anything"));

        mock.restrict_outputs(vec!["pdf"]);
        assert!(mock.supports_output("pdf"));
        assert!(!mock.supports_output("jpg"));
    }
}
