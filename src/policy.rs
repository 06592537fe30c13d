//! Injection policy flags and the merge strategy they select.

/// Sentinel value expected in strict mode unless overridden.
pub const DEFAULT_STRICT_VALUE: &str = "chamberme";

/// Policy for one run. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Do not inherit the calling process's environment.
    pub pristine: bool,
    /// Only fill variables whose value is the sentinel, failing on leftovers.
    pub strict: bool,
    /// Never overwrite an existing variable.
    pub no_clobber: bool,
    /// Sentinel value compared against in strict mode.
    pub strict_value: String,
    /// Use store keys verbatim instead of normalizing secret paths.
    pub no_paths: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            pristine: false,
            strict: false,
            no_clobber: false,
            strict_value: DEFAULT_STRICT_VALUE.to_string(),
            no_paths: false,
        }
    }
}

impl PolicyFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pristine(mut self, pristine: bool) -> Self {
        self.pristine = pristine;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_no_clobber(mut self, no_clobber: bool) -> Self {
        self.no_clobber = no_clobber;
        self
    }

    pub fn with_strict_value(mut self, strict_value: impl Into<String>) -> Self {
        self.strict_value = strict_value.into();
        self
    }

    pub fn with_no_paths(mut self, no_paths: bool) -> Self {
        self.no_paths = no_paths;
        self
    }

    /// Whether secret keys come from structured paths.
    pub fn hierarchical(&self) -> bool {
        !self.no_paths
    }

    /// The merge strategy for this run.
    ///
    /// Strict mode takes precedence; otherwise no-clobber selects
    /// [`MergeStrategy::Preserve`] and the default is
    /// [`MergeStrategy::Overwrite`].
    pub fn strategy(&self) -> MergeStrategy {
        if self.strict {
            MergeStrategy::StrictSubstitute
        } else if self.no_clobber {
            MergeStrategy::Preserve
        } else {
            MergeStrategy::Overwrite
        }
    }
}

/// How secrets are merged into the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Secrets replace existing variables.
    Overwrite,
    /// Existing variables are kept.
    Preserve,
    /// Only sentinel variables are filled, after validation.
    StrictSubstitute,
}
