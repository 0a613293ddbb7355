//! Headless browser hosting the application under test.
//!
//! Launches Chromium over the DevTools protocol, opens the entry document,
//! and exposes the page as a [`ScriptHost`]. The protocol event loop runs on
//! a current-thread runtime owned by the handle, so the harness itself stays
//! sequential.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::bridge::ScriptHost;
use crate::config::HarnessConfig;
use crate::types::HarnessError;

/// A running browser with the application loaded in one page.
pub struct Environment {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    profile: TempDir,
    marker: String,
    poll_interval: Duration,
}

impl Environment {
    /// Launches the browser on a throw-away profile and opens the entry
    /// document. Nothing is left running if this fails.
    pub fn acquire(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let url = entry_url(&config.app)?;

        let profile = tempfile::Builder::new()
            .prefix("hoopsim-e2e-")
            .tempdir()
            .map_err(|e| HarnessError::Launch(format!("failed to create profile dir: {e}")))?;

        let browser_config = browser_config(config, profile.path())?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HarnessError::Launch(format!("failed to start runtime: {e}")))?;

        let (browser, mut events) = runtime
            .block_on(Browser::launch(browser_config))
            .map_err(|e| HarnessError::Launch(e.to_string()))?;
        debug!(profile = %profile.path().display(), "browser launched");

        let handler = runtime.spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "devtools event error");
                }
            }
        });

        let page = match runtime.block_on(browser.new_page(url.clone())) {
            Ok(page) => page,
            Err(e) => {
                shutdown(&runtime, browser, &handler);
                return Err(HarnessError::Open(format!("{url}: {e}")));
            }
        };
        info!(%url, "application loaded");

        Ok(Self {
            runtime,
            browser,
            page,
            handler,
            profile,
            marker: config.ready_marker.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Polls for the readiness marker element until it appears or `timeout`
    /// elapses.
    pub fn await_ready(&self, timeout: Duration) -> Result<(), HarnessError> {
        await_marker(self, &self.marker, timeout, self.poll_interval)
    }
}

impl Release for Environment {
    /// Closes the browser and removes its profile.
    fn release(self) {
        let Self {
            runtime,
            browser,
            page,
            handler,
            profile,
            ..
        } = self;

        drop(page);
        shutdown(&runtime, browser, &handler);
        drop(runtime);

        if let Err(e) = profile.close() {
            warn!(error = %e, "failed to remove browser profile");
        }
        info!("browser released");
    }
}

impl ScriptHost for Environment {
    fn evaluate(&self, script: &str) -> Result<Value, HarnessError> {
        let result = self
            .runtime
            .block_on(self.page.evaluate_expression(script.to_string()))
            .map_err(|e| HarnessError::Invocation(e.to_string()))?;

        // `undefined` has no value.
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    fn settle(&self, delay: Duration) {
        trace!(?delay, "settling");
        self.runtime.block_on(tokio::time::sleep(delay));
    }
}

/// A resource that has to be given back exactly once.
pub trait Release {
    fn release(self);
}

/// Acquires a resource, runs `f` against it, and releases it afterwards,
/// whatever `f` returns. Nothing is released when acquisition fails.
pub fn scoped<R: Release, T>(
    acquire: impl FnOnce() -> Result<R, HarnessError>,
    f: impl FnOnce(&R) -> Result<T, HarnessError>,
) -> Result<T, HarnessError> {
    let resource = acquire()?;
    let outcome = f(&resource);
    resource.release();
    outcome
}

/// Runs `f` against a freshly launched browser, see [`scoped`].
pub fn with_environment<T>(
    config: &HarnessConfig,
    f: impl FnOnce(&Environment) -> Result<T, HarnessError>,
) -> Result<T, HarnessError> {
    scoped(|| Environment::acquire(config), f)
}

/// Polls `host` until an element with id `marker` exists, sleeping `poll`
/// between checks. Fails with [`HarnessError::Timeout`] once `timeout` has
/// elapsed without seeing it.
pub fn await_marker(
    host: &impl ScriptHost,
    marker: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<(), HarnessError> {
    let check = format!(
        "document.getElementById({}) !== null",
        Value::String(marker.to_string())
    );
    let start = Instant::now();

    loop {
        // Evaluation fails while the page is still navigating; keep polling.
        if matches!(host.evaluate(&check), Ok(Value::Bool(true))) {
            debug!(marker, elapsed = ?start.elapsed(), "readiness marker present");
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(HarnessError::Timeout {
                marker: marker.to_string(),
                waited: timeout,
            });
        }
        host.settle(poll.min(timeout - elapsed));
    }
}

fn shutdown(runtime: &Runtime, mut browser: Browser, handler: &JoinHandle<()>) {
    runtime.block_on(async {
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser did not close cleanly, killing it");
            if let Some(Err(e)) = browser.kill().await {
                warn!(error = %e, "failed to kill browser");
            }
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "failed to reap browser process");
        }
    });
    handler.abort();
}

fn browser_config(config: &HarnessConfig, profile: &Path) -> Result<BrowserConfig, HarnessError> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-gpu")
        .arg("--start-maximized")
        .user_data_dir(profile);

    if let Some(ref chrome) = config.chrome {
        builder = builder.chrome_executable(chrome);
    }

    builder.build().map_err(HarnessError::Launch)
}

/// Builds the `file://` URL of the entry document.
pub fn entry_url(app: &Path) -> Result<String, HarnessError> {
    let path = app.canonicalize().map_err(|e| {
        HarnessError::Launch(format!("entry document not found: {}: {e}", app.display()))
    })?;

    if !path.is_file() {
        return Err(HarnessError::Launch(format!(
            "entry document is not a file: {}",
            path.display()
        )));
    }

    let encoded = path
        .to_string_lossy()
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");

    Ok(format!("file://{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::ScriptedHost;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Stand-in resource that counts how often it is released.
    struct Counted {
        releases: Rc<Cell<u32>>,
        host: ScriptedHost,
    }

    impl Release for Counted {
        fn release(self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    fn counted(replies: Vec<Result<Value, HarnessError>>) -> (Rc<Cell<u32>>, Counted) {
        let releases = Rc::new(Cell::new(0));
        let resource = Counted {
            releases: Rc::clone(&releases),
            host: ScriptedHost::new(replies),
        };
        (releases, resource)
    }

    #[test]
    fn test_scoped_releases_once_on_success() {
        let (releases, resource) = counted(vec![]);
        let outcome = scoped(|| Ok(resource), |_| Ok(7));
        assert_eq!(outcome.unwrap(), 7);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_scoped_releases_once_when_body_fails() {
        let (releases, resource) = counted(vec![]);
        let outcome: Result<(), _> = scoped(
            || Ok(resource),
            |_| Err(HarnessError::Invocation("ReferenceError".to_string())),
        );
        assert!(matches!(outcome, Err(HarnessError::Invocation(_))));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_scoped_releases_once_after_readiness_timeout() {
        let (releases, resource) = counted(vec![Ok(json!(false))]);
        let outcome = scoped(
            || Ok(resource),
            |r| await_marker(&r.host, "app", Duration::ZERO, Duration::ZERO),
        );
        assert!(matches!(outcome, Err(HarnessError::Timeout { .. })));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_scoped_skips_body_and_release_when_acquire_fails() {
        let ran = Cell::new(false);
        let outcome: Result<(), _> = scoped(
            || -> Result<Counted, _> { Err(HarnessError::Launch("no chrome".to_string())) },
            |_| {
                ran.set(true);
                Ok(())
            },
        );
        assert!(matches!(outcome, Err(HarnessError::Launch(_))));
        assert!(!ran.get());
    }

    #[test]
    fn test_await_marker_times_out_when_marker_never_appears() {
        let host = ScriptedHost::new(vec![Ok(json!(false)), Ok(json!(false))]);
        let err = await_marker(&host, "app", Duration::ZERO, Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err.to_string(), "timed out after 0ns waiting for #app");
        match err {
            HarnessError::Timeout { marker, waited } => {
                assert_eq!(marker, "app");
                assert_eq!(waited, Duration::ZERO);
            }
            other => panic!("unexpected: {other:?}"),
        }
        // One check, no sleep, once the bound is spent.
        assert_eq!(host.calls.borrow().len(), 1);
    }

    #[test]
    fn test_await_marker_polls_until_present() {
        let host = ScriptedHost::new(vec![Ok(json!(false)), Ok(json!(false)), Ok(json!(true))]);
        await_marker(&host, "app", Duration::from_secs(60), Duration::ZERO).unwrap();

        let calls = host.calls.borrow();
        let checks = calls.iter().filter(|c| c.starts_with("eval:")).count();
        assert_eq!(checks, 3);
        assert!(calls[0].contains("document.getElementById(\"app\") !== null"));
    }

    #[test]
    fn test_await_marker_retries_after_evaluation_error() {
        let host = ScriptedHost::new(vec![
            Err(HarnessError::Invocation("Execution context was destroyed".to_string())),
            Ok(json!(true)),
        ]);
        assert!(await_marker(&host, "app", Duration::from_secs(60), Duration::ZERO).is_ok());
    }

    #[test]
    fn test_open_failure_is_after_launch() {
        assert!(!HarnessError::Open("file:///x/index.html: net error".to_string()).is_launch());
    }

    #[test]
    fn test_entry_url_for_existing_file() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("index.html");
        std::fs::write(&app, "<div id=\"app\"></div>").unwrap();

        let url = entry_url(&app).unwrap();
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("/index.html"));
    }

    #[test]
    fn test_entry_url_escapes_spaces() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("my league.html");
        std::fs::write(&app, "").unwrap();

        let url = entry_url(&app).unwrap();
        assert!(url.ends_with("/my%20league.html"), "{url}");
    }

    #[test]
    fn test_entry_url_missing_file() {
        let err = entry_url(Path::new("/nonexistent/index.html")).unwrap_err();
        assert!(matches!(err, HarnessError::Launch(_)));
        assert!(err.is_launch());
    }

    #[test]
    fn test_entry_url_rejects_directory() {
        let dir = TempDir::new().unwrap();
        assert!(entry_url(dir.path()).is_err());
    }

    #[test]
    fn test_acquire_fails_before_launch_without_document() {
        let config = HarnessConfig {
            app: "/nonexistent/index.html".into(),
            ..HarnessConfig::default()
        };
        assert!(matches!(
            Environment::acquire(&config),
            Err(HarnessError::Launch(_))
        ));
    }
}
