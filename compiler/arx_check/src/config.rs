//! Analysis configuration.

/// Knobs for [`crate::check_program`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckConfig {
    /// Merge redundant generation checks. Turning this off keeps one check
    /// per textual access; stale-handle errors are reported either way.
    pub coalesce: bool,
    /// Join rounds at a loop header before bounds are widened.
    pub widening_limit: u32,
    /// Block visits allowed per bounds query before it times out.
    pub interval_fuel: u32,
    /// Emit a note for every bounds check that stays.
    pub report_retained_bounds: bool,
    /// Analyze functions on the rayon pool.
    pub parallel: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            coalesce: !cfg!(feature = "debug-stale-handles"),
            widening_limit: 8,
            interval_fuel: 4096,
            report_retained_bounds: false,
            parallel: true,
        }
    }
}

impl CheckConfig {
    /// Defaults overlaid with `ARX_NO_COALESCE` and `ARX_REPORT_BOUNDS`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup("ARX_NO_COALESCE").is_some_and(|v| is_truthy(&v)) {
            self.coalesce = false;
        }
        if lookup("ARX_REPORT_BOUNDS").is_some_and(|v| is_truthy(&v)) {
            self.report_retained_bounds = true;
        }
        self
    }

    /// One check per textual access, for chasing stale-handle bugs.
    #[must_use]
    pub fn without_coalescing(mut self) -> Self {
        self.coalesce = false;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}
