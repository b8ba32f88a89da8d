pub mod completions;
pub mod doctor;
pub mod install;
pub mod list;
pub mod uninstall;
pub mod version;

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::engine::{Engine, EngineContext, RunOptions, RunReport};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::report;
use crate::resources::{PackageBackend, SystemFileSystem};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection and configuration loading so that each
/// command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Loaded configuration and bundle registry.
    pub config: Config,
}

impl CommandSetup {
    /// Detect the platform and load the bundle configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is missing or invalid.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let platform = Platform::detect();
        log.debug(&format!("platform: {platform}"));

        log.stage("Loading configuration");
        let config = Config::load(&global.config, &platform, &SystemFileSystem)?;
        log.info(&format!(
            "loaded {} bundles from {}",
            config.registry.len(),
            config.path.display()
        ));
        match config.package_manager {
            Some(pm) => log.debug(&format!("package manager: {pm}")),
            None => log.warn("no supported package manager detected"),
        }
        for (package, manager) in &config.package_overrides {
            log.debug(&format!("{package} is installed with {manager}"));
        }

        if !config.warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                config.warnings.len()
            ));
            for warning in &config.warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self { platform, config })
    }

    /// Wire the production backends for this configuration.
    #[must_use]
    pub fn engine_context(&self, log: Arc<dyn Log>, cancel: Arc<AtomicBool>) -> EngineContext {
        let backend = PackageBackend::new(self.config.package_manager, Arc::new(SystemExecutor))
            .with_overrides(self.config.package_overrides.clone());
        EngineContext::system(Arc::new(backend), log).with_cancel_flag(cancel)
    }
}

/// Run the engine over `bundles`, report the outcome, and bail if any
/// bundle did not succeed.
///
/// # Errors
///
/// Returns an error on structural configuration defects, or if one or more
/// bundles failed or were skipped, or if the run was interrupted.
pub fn run_to_completion(
    setup: &CommandSetup,
    ctx: &EngineContext,
    bundles: &[String],
    options: RunOptions,
    global: &GlobalOpts,
    log: &Logger,
) -> Result<RunReport> {
    let engine = Engine::new(&setup.config.registry, ctx);
    let report = engine.run(bundles, options)?;

    report::record(log, &report);
    if global.json {
        report::print_json(&report)?;
    } else {
        log.print_summary();
    }

    if report.interrupted {
        anyhow::bail!("interrupted");
    }
    let failed = report.failed_count() + report.skipped_count();
    if failed > 0 {
        anyhow::bail!("{failed} bundle(s) did not succeed");
    }
    Ok(report)
}
