//! Non-fatal configuration checks.
use std::collections::HashSet;

use crate::registry::Bundle;
use crate::resources::FileSystemProbe;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Bundle the warning belongs to.
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.item, self.message)
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate and return any warnings found.
    fn validate(&self, fs: &dyn FileSystemProbe) -> Vec<ValidationWarning>;

    /// Short name for this validator (e.g., "sources", "packages").
    fn name(&self) -> &'static str;
}

/// Warns about dotfile sources that do not exist.
#[derive(Debug)]
pub struct SourceValidator<'a> {
    bundles: &'a [Bundle],
}

impl<'a> SourceValidator<'a> {
    #[must_use]
    pub const fn new(bundles: &'a [Bundle]) -> Self {
        Self { bundles }
    }
}

impl ConfigValidator for SourceValidator<'_> {
    fn validate(&self, fs: &dyn FileSystemProbe) -> Vec<ValidationWarning> {
        self.bundles
            .iter()
            .flat_map(|b| b.dotfiles.iter().map(move |m| (b, m)))
            .filter(|(_, m)| !fs.exists(&m.source))
            .map(|(b, m)| {
                ValidationWarning::new(
                    &b.name,
                    m.target.display().to_string(),
                    format!("source does not exist: {}", m.source.display()),
                )
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "sources"
    }
}

/// Warns about bundles with nothing to do and packages listed twice.
#[derive(Debug)]
pub struct BundleContentValidator<'a> {
    bundles: &'a [Bundle],
}

impl<'a> BundleContentValidator<'a> {
    #[must_use]
    pub const fn new(bundles: &'a [Bundle]) -> Self {
        Self { bundles }
    }
}

impl ConfigValidator for BundleContentValidator<'_> {
    fn validate(&self, _fs: &dyn FileSystemProbe) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for bundle in self.bundles {
            if bundle.packages.is_empty() && bundle.dotfiles.is_empty() && bundle.dependencies.is_empty() {
                warnings.push(ValidationWarning::new(
                    &bundle.name,
                    &bundle.name,
                    "bundle has no packages, dotfiles or dependencies",
                ));
            }
            let mut seen = HashSet::new();
            for pkg in &bundle.packages {
                if !seen.insert(pkg.as_str()) {
                    warnings.push(ValidationWarning::new(
                        &bundle.name,
                        pkg,
                        "package is listed more than once",
                    ));
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "bundles"
    }
}

/// Run every validator over `bundles`.
#[must_use]
pub fn validate_all(bundles: &[Bundle], fs: &dyn FileSystemProbe) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 2] = [
        &SourceValidator::new(bundles),
        &BundleContentValidator::new(bundles),
    ];
    validators
        .iter()
        .flat_map(|v| {
            let warnings = v.validate(fs);
            tracing::trace!(validator = v.name(), count = warnings.len(), "validated");
            warnings
        })
        .collect()
}
