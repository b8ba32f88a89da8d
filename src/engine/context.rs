use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::logging::Log;
use crate::resources::{
    FileSystemProbe, Linker, PackageBackend, PackageInstaller, PackageProbe, SystemFileSystem,
    SystemLinker,
};

/// Collaborators the engine drives during a run.
pub struct EngineContext {
    /// Read-only filesystem view used for planning.
    pub fs: Arc<dyn FileSystemProbe>,
    /// Creates links and copies.
    pub linker: Arc<dyn Linker>,
    /// Answers whether packages are installed.
    pub packages: Arc<dyn PackageProbe>,
    /// Installs missing packages.
    pub installer: Arc<dyn PackageInstaller>,
    /// Logger for progress output.
    pub log: Arc<dyn Log>,
    /// Set from a signal handler to stop before the next bundle.
    pub cancel: Arc<AtomicBool>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("fs", &self.fs)
            .field("linker", &self.linker)
            .field("packages", &self.packages)
            .field("installer", &self.installer)
            .field("log", &"<dyn Log>")
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl EngineContext {
    /// Wire an engine context from explicit collaborators.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileSystemProbe>,
        linker: Arc<dyn Linker>,
        packages: Arc<dyn PackageProbe>,
        installer: Arc<dyn PackageInstaller>,
        log: Arc<dyn Log>,
    ) -> Self {
        Self {
            fs,
            linker,
            packages,
            installer,
            log,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Production wiring: the real filesystem plus `backend` for packages.
    #[must_use]
    pub fn system(backend: Arc<PackageBackend>, log: Arc<dyn Log>) -> Self {
        Self::new(
            Arc::new(SystemFileSystem),
            Arc::new(SystemLinker),
            Arc::clone(&backend) as Arc<dyn PackageProbe>,
            backend,
            log,
        )
    }

    /// Share an externally owned cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
