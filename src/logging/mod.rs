//! Run output: the [`Log`] sink the engine reports through, and the tracing
//! setup behind it.

mod logger;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, SummaryEntry, SummaryStatus};

/// Held by tests that point `XDG_CACHE_HOME` somewhere else.
#[cfg(test)]
static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with `XDG_CACHE_HOME` set to `dir`.
#[cfg(test)]
pub(crate) fn with_cache_home<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let _lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    // SAFETY: no other test touches the environment while the lock is held.
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", dir);
    }
    let value = f();
    #[allow(unsafe_code)]
    unsafe {
        std::env::remove_var("XDG_CACHE_HOME");
    }
    value
}

/// A [`Logger`] whose events land in a log file under a temp cache dir.
/// Keep the guard alive while the test logs.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let cache = tempfile::tempdir().expect("temp cache dir");
    let (file_layer, log) = with_cache_home(cache.path(), || {
        (subscriber::FileLayer::new("test"), Logger::new("test"))
    });
    let file_layer = file_layer.expect("log file under temp cache");
    let dispatch = tracing::Dispatch::new(
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG)),
    );
    let guard = tracing::dispatcher::set_default(&dispatch);
    (log, cache, guard)
}
