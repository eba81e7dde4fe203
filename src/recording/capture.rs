use super::CaptureError;

/// Audio capture backend.
///
/// Implementations accumulate raw chunks between `start` and `stop`;
/// `stop` must release the device unconditionally, even when
/// finalization fails.
pub trait AudioCapture {
    /// Request device access and begin accumulating chunks.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop capturing, release the device and return the accumulated
    /// chunks in arrival order.
    fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// Whether the backend can produce the given codec identifier.
    fn supports_codec(&self, mime: &str) -> bool;
}

/// Mock capture backend for tests.
pub struct MockCapture {
    chunks: Vec<Vec<u8>>,
    supported: Vec<String>,
    fail_start: Option<CaptureError>,
    fail_stop: Option<CaptureError>,
    started: bool,
}

impl MockCapture {
    pub fn new() -> Self {
        Self {
            chunks: vec![vec![1, 2, 3], vec![], vec![4, 5]],
            supported: vec!["audio/webm;codecs=opus".into()],
            fail_start: None,
            fail_stop: None,
            started: false,
        }
    }

    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_supported(mut self, supported: &[&str]) -> Self {
        self.supported = supported.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_start_failure(mut self, error: CaptureError) -> Self {
        self.fail_start = Some(error);
        self
    }

    pub fn with_stop_failure(mut self, error: CaptureError) -> Self {
        self.fail_stop = Some(error);
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for MockCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MockCapture {
    fn start(&mut self) -> Result<(), CaptureError> {
        if let Some(error) = &self.fail_start {
            return Err(error.clone());
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        self.started = false;
        if let Some(error) = &self.fail_stop {
            return Err(error.clone());
        }
        Ok(self.chunks.clone())
    }

    fn supports_codec(&self, mime: &str) -> bool {
        self.supported.iter().any(|s| s == mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_capture_start_stop_state() {
        let mut capture = MockCapture::new();
        assert!(!capture.is_started());
        capture.start().unwrap();
        assert!(capture.is_started());
        capture.stop().unwrap();
        assert!(!capture.is_started());
    }

    #[test]
    fn mock_capture_reports_configured_failure() {
        let mut capture = MockCapture::new().with_start_failure(CaptureError::PermissionDenied);
        assert!(matches!(
            capture.start(),
            Err(CaptureError::PermissionDenied)
        ));
        assert!(!capture.is_started());
    }

    #[test]
    fn mock_capture_stop_releases_even_on_failure() {
        let mut capture =
            MockCapture::new().with_stop_failure(CaptureError::Backend("flush".into()));
        capture.start().unwrap();
        assert!(capture.stop().is_err());
        assert!(!capture.is_started());
    }

    #[test]
    fn trait_is_object_safe() {
        let mut capture: Box<dyn AudioCapture> = Box::new(MockCapture::new());
        capture.start().unwrap();
        let chunks = capture.stop().unwrap();
        assert_eq!(chunks.len(), 3);
    }
}
