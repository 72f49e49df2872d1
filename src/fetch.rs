use std::cell::Cell;
use std::path::PathBuf;

use backon::{BlockingRetryable, ExponentialBuilder};

use crate::config::RetryConfig;
use crate::error::{Result, TrajectoryError};

/// Anything that can hand back the raw CSV snapshot.
pub trait CsvSource {
    /// URL or path, used in log records and error messages.
    fn location(&self) -> &str;

    /// One attempt; no retrying here.
    fn fetch(&self) -> Result<Vec<u8>>;
}

// ── HTTP ────────────────────────────────────────────────────────────────────

pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, retry: &RetryConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(retry.request_timeout())
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl CsvSource for HttpSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self.client.get(&self.url).send()?;

        if !resp.status().is_success() {
            return Err(TrajectoryError::HttpStatus {
                url: self.url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes()?;
        Ok(bytes.to_vec())
    }
}

// ── Local file ──────────────────────────────────────────────────────────────

pub struct FileSource {
    path: PathBuf,
    display: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

impl CsvSource for FileSource {
    fn location(&self) -> &str {
        &self.display
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

// ── Retry ───────────────────────────────────────────────────────────────────

/// Fetch with bounded exponential backoff.
///
/// Only retryable errors are retried. Whatever ends the loop is wrapped in
/// `FetchFailed` together with the number of attempts made.
pub fn fetch_with_retry(source: &dyn CsvSource, retry: &RetryConfig) -> Result<Vec<u8>> {
    let attempts = Cell::new(0u32);
    let backoff = ExponentialBuilder::default()
        .with_min_delay(retry.min_delay())
        .with_max_delay(retry.max_delay())
        .with_max_times(retry.max_attempts.saturating_sub(1) as usize);

    let result = (|| {
        attempts.set(attempts.get() + 1);
        source.fetch()
    })
    .retry(backoff)
    .sleep(std::thread::sleep)
    .when(TrajectoryError::is_retryable)
    .notify(|err, delay| {
        tracing::warn!(
            source = source.location(),
            attempt = attempts.get(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Fetch failed, retrying"
        );
    })
    .call();

    match result {
        Ok(bytes) => {
            tracing::info!(
                source = source.location(),
                attempts = attempts.get(),
                bytes = bytes.len(),
                "Fetched case data"
            );
            Ok(bytes)
        }
        Err(err) => {
            tracing::error!(
                source = source.location(),
                attempts = attempts.get(),
                error = %err,
                "Giving up on fetch"
            );
            Err(TrajectoryError::FetchFailed {
                url: source.location().to_string(),
                attempts: attempts.get(),
                source: Box::new(err),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replays a scripted list of outcomes, one per attempt.
    struct ScriptedSource {
        outcomes: RefCell<Vec<Result<Vec<u8>>>>,
        calls: Cell<u32>,
    }

    impl ScriptedSource {
        fn new(mut outcomes: Vec<Result<Vec<u8>>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: RefCell::new(outcomes),
                calls: Cell::new(0),
            }
        }
    }

    impl CsvSource for ScriptedSource {
        fn location(&self) -> &str {
            "scripted://cases.csv"
        }

        fn fetch(&self) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            self.outcomes
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(TrajectoryError::InvalidData("script exhausted".into())))
        }
    }

    fn status(code: u16) -> TrajectoryError {
        TrajectoryError::HttpStatus {
            url: "scripted://cases.csv".into(),
            status: code,
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            min_delay_ms: 1,
            max_delay_ms: 2,
            request_timeout_secs: 1,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let source = ScriptedSource::new(vec![
            Err(status(503)),
            Err(status(502)),
            Ok(b"a,b\n".to_vec()),
        ]);
        let bytes = fetch_with_retry(&source, &fast_retry(4)).unwrap();
        assert_eq!(bytes, b"a,b\n");
        assert_eq!(source.calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let source = ScriptedSource::new(vec![Err(status(500)), Err(status(500)), Err(status(500))]);
        let err = fetch_with_retry(&source, &fast_retry(2)).unwrap_err();
        assert_eq!(source.calls.get(), 2);
        match err {
            TrajectoryError::FetchFailed { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn does_not_retry_client_errors() {
        let source = ScriptedSource::new(vec![Err(status(404)), Ok(Vec::new())]);
        let err = fetch_with_retry(&source, &fast_retry(5)).unwrap_err();
        assert_eq!(source.calls.get(), 1);
        assert!(err.to_string().contains("HTTP status 404"));
    }

    #[test]
    fn file_source_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confirmed.csv");
        std::fs::write(&path, "Province/State,Country/Region,Lat,Long\n").unwrap();
        let source = FileSource::new(&path);
        let bytes = fetch_with_retry(&source, &fast_retry(1)).unwrap();
        assert!(bytes.starts_with(b"Province/State"));
    }

    #[test]
    fn missing_file_is_a_fetch_failure() {
        let source = FileSource::new("/nonexistent/confirmed.csv");
        let err = fetch_with_retry(&source, &fast_retry(3)).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Fetch);
    }
}
