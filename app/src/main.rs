use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tokio::runtime::{Builder, Runtime};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warden_adapters::mysql::MysqlRecordBackend;
use warden_core::config::DatabaseConfig;
use warden_core::navigation::Navigator;
use warden_core::query_executor::{QueryExecutor, RecordBackend};
use warden_tui::TuiError;

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn init_logging(config: &DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file = open_log_file(&config.log_file)?;
    let filter = EnvFilter::try_new(&config.log_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}

/// Drives one console session. The backend is disconnected however the
/// session ends; a backend failure is logged and returned.
fn run_session<B: RecordBackend>(
    runtime: &Runtime,
    backend: B,
    run_tui: impl FnOnce(&mut Navigator<B>) -> Result<(), TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut navigator = Navigator::new(QueryExecutor::new(backend));
    let result = run_tui(&mut navigator);

    if let Err(disconnect_error) = runtime.block_on(navigator.executor().disconnect()) {
        warn!(error = %disconnect_error, "backend disconnect failed");
    }

    match result {
        Ok(()) => {
            info!("session closed");
            Ok(())
        }
        Err(fatal) => {
            error!(error = %fatal, "session aborted");
            Err(fatal.into())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DatabaseConfig::load_default()?;
    init_logging(&config)?;
    info!(dsn = %config.redacted_dsn(), "configuration loaded");

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let backend = MysqlRecordBackend::from_config(&config)?;
    run_session(&runtime, backend, |navigator| {
        warden_tui::run(navigator, &runtime)
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::runtime::{Builder, Runtime};
    use warden_core::navigation::{NavInput, NavigationError};
    use warden_core::query_executor::{
        BackendError, ExecutorError, MutationOutcome, RecordBackend, RowStream,
    };
    use warden_core::records::RawRow;
    use warden_core::statements::SqlParam;
    use warden_tui::TuiError;

    use super::{open_log_file, run_session};

    #[derive(Debug, Default)]
    struct CountingBackend {
        disconnects: Arc<AtomicUsize>,
        fail_queries: bool,
    }

    struct EmptyStream;

    #[async_trait]
    impl RowStream for EmptyStream {
        async fn next_row(&mut self) -> Result<Option<RawRow>, BackendError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl RecordBackend for CountingBackend {
        type Stream = EmptyStream;

        async fn mutate(
            &self,
            _sql: &str,
            _params: &[SqlParam],
        ) -> Result<MutationOutcome, BackendError> {
            Err(BackendError::new("connection refused"))
        }

        async fn query(
            &self,
            _sql: &str,
            _params: &[SqlParam],
        ) -> Result<Self::Stream, BackendError> {
            if self.fail_queries {
                return Err(BackendError::new("server has gone away"));
            }
            Ok(EmptyStream)
        }

        async fn disconnect(&self) -> Result<(), BackendError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runtime() -> Runtime {
        Builder::new_current_thread()
            .build()
            .expect("runtime should build")
    }

    #[test]
    fn clean_quit_disconnects_the_backend() {
        let runtime = runtime();
        let backend = CountingBackend::default();
        let disconnects = Arc::clone(&backend.disconnects);

        let result = run_session(&runtime, backend, |navigator| {
            runtime
                .block_on(navigator.handle(NavInput::Char('q')))
                .map_err(TuiError::from)?;
            assert!(navigator.should_quit());
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backend_failure_ends_the_session_and_disconnects() {
        let runtime = runtime();
        let backend = CountingBackend::default();
        let disconnects = Arc::clone(&backend.disconnects);

        let result = run_session(&runtime, backend, |navigator| {
            for input in [
                NavInput::Char('w'),
                NavInput::Char('a'),
                NavInput::Char('x'),
                NavInput::Next,
                NavInput::Char('y'),
                NavInput::Next,
            ] {
                runtime.block_on(navigator.handle(input))?;
            }
            runtime.block_on(navigator.handle(NavInput::Select))?;
            Ok(())
        });

        let error = result.expect_err("backend failure should be fatal");
        let tui_error = error
            .downcast_ref::<TuiError>()
            .expect("fatal error should be a tui error");
        assert!(matches!(
            tui_error,
            TuiError::Backend(NavigationError::Backend(ExecutorError::Backend(_)))
        ));
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_search_ends_the_session_and_disconnects() {
        let runtime = runtime();
        let backend = CountingBackend {
            fail_queries: true,
            ..CountingBackend::default()
        };
        let disconnects = Arc::clone(&backend.disconnects);

        let result = run_session(&runtime, backend, |navigator| {
            for input in [
                NavInput::Char('b'),
                NavInput::Char('s'),
                NavInput::Next,
                NavInput::Char('%'),
                NavInput::Next,
                NavInput::Select,
            ] {
                runtime.block_on(navigator.handle(input))?;
            }
            Ok(())
        });

        let error = result.expect_err("query failure should be fatal");
        assert!(error.to_string().contains("server has gone away"));
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tui_io_errors_propagate() {
        let runtime = runtime();
        let result = run_session(&runtime, CountingBackend::default(), |_| {
            Err(TuiError::Io(std::io::Error::other("boom")))
        });
        assert!(result.is_err());
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warden.log");

        writeln!(open_log_file(&path).expect("first open"), "first").expect("write");
        writeln!(open_log_file(&path).expect("second open"), "second").expect("write");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "first\nsecond\n");
    }
}
