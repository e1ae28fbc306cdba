//! Logging facilities for Horizon Quantity.
//!
//! Horizon Quantity uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in your
//! application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_quantity=debug")
//!         .init();
//! }
//! ```
//!
//! The constants in [`targets`] match the targets used by every log event in
//! the workspace, so they can be used directly in filter directives.

/// Span names used throughout Horizon Quantity for tracing.
pub mod span_names {
    /// One signal emission.
    pub const SIGNAL: &str = "horizon_quantity::signal";
    /// Quantity update span.
    pub const QUANTITY: &str = "horizon_quantity::quantity";
    /// Range recomputation span.
    pub const RANGE: &str = "horizon_quantity::range";
    /// Bulk settings load span.
    pub const SETTINGS: &str = "horizon_quantity::settings";
}

/// `target:` values used by every event in the workspace.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_quantity_core";
    /// Slot connection and emission.
    pub const SIGNAL: &str = "horizon_quantity_core::signal";
    /// Quantity value and notification target.
    pub const QUANTITY: &str = "horizon_quantity::quantity";
    /// Hardware read/write target.
    pub const HARDWARE: &str = "horizon_quantity::hardware";
    /// Range model target.
    pub const RANGE: &str = "horizon_quantity::range";
    /// Registry target.
    pub const REGISTRY: &str = "horizon_quantity::registry";
}

/// Keeps an `info`-level span entered for the lifetime of the guard, so the
/// duration of a range cascade or settings load shows up in span timings.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span tagged with `name` (one of [`span_names`]).
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_quantity::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_share_prefixes() {
        assert!(targets::SIGNAL.starts_with(targets::CORE));
        for target in [targets::QUANTITY, targets::HARDWARE, targets::RANGE, targets::REGISTRY] {
            assert!(target.starts_with("horizon_quantity::"));
        }
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new(span_names::SETTINGS);
    }
}
