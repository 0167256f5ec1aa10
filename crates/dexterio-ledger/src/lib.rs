//! dexterio-ledger
//!
//! The ordered trade ledger and equity curve, plus the locked-formula
//! metrics computed over them (§4.8): profit_factor, expectancy_R,
//! max_drawdown_R, winrate, each reported on both net and gross R and
//! sliced per-playbook and per-day.

pub mod ledger;
pub mod metrics;
pub mod report;

pub use ledger::Ledger;
pub use metrics::{compute_dual_metrics, compute_metrics, DualMetrics, Metrics};
pub use report::{build_report, et_date, Report};
