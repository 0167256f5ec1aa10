use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use dexterio_schemas::{CandleFamily, DayType, GateBypass, IctKind, Session, Structure, TradeType};

/// An ET minute-of-day window, inclusive of both ends, e.g. 570..=660 is
/// 09:30-11:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl MinuteWindow {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.start_minute && minute_of_day <= self.end_minute
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub w_ict: f64,
    pub w_pattern: f64,
    pub w_context: f64,
}

impl ScoringWeights {
    pub fn is_normalized(&self) -> bool {
        (self.w_ict + self.w_pattern + self.w_context - 1.0).abs() < 1e-6
    }
}

/// A declarative playbook record, loaded once per run from the catalog file.
/// Trading doctrine lives entirely in this data, not in invented logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub name: String,
    pub category: TradeType,
    pub structure_htf: BTreeSet<Structure>,
    pub session_allowed: BTreeSet<Session>,
    pub day_type_allowed: BTreeSet<DayType>,
    pub required_ict_families: BTreeSet<IctKind>,
    pub required_candlestick_families: BTreeSet<CandleFamily>,
    pub time_windows: Vec<MinuteWindow>,
    pub min_rr: f64,
    pub scoring_weights: ScoringWeights,
    #[serde(default)]
    pub min_atr_floor: f64,
    /// Floor below `score_below_min`'s computed score causes a rejection
    /// even though the non-score gates all passed. Distinct from the grade
    /// thresholds, which only classify an already-accepted match.
    #[serde(default)]
    pub min_score: f64,
}

/// The default target for AGGRESSIVE relaxation is zero bypasses; any
/// non-empty set here is a transitional auditable exception.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BypassTable {
    #[serde(default)]
    pub bypasses: BTreeSet<GateBypass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookCatalog {
    pub playbooks: Vec<Playbook>,
    #[serde(default)]
    pub aggressive_bypasses: BypassTable,
    /// Minute-of-day window applied to any playbook that declares no
    /// `time_windows` of its own.
    #[serde(default = "default_time_windows")]
    pub default_time_windows: Vec<MinuteWindow>,
}

fn default_time_windows() -> Vec<MinuteWindow> {
    vec![MinuteWindow {
        start_minute: 0,
        end_minute: 1439,
    }]
}

impl PlaybookCatalog {
    /// Load a catalog from a single declarative YAML file. Any parse error
    /// fails the run with `ConfigError` reason `playbook_config_invalid`.
    pub fn load(path: &std::path::Path) -> Result<PlaybookCatalog> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read playbook catalog: {}", path.display()))?;
        let catalog: PlaybookCatalog = serde_yaml::from_str(&raw)
            .with_context(|| format!("playbook_config_invalid: {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.playbooks.is_empty() {
            bail!("playbook_config_invalid: catalog has zero playbooks");
        }
        let mut seen = BTreeSet::new();
        for pb in &self.playbooks {
            if !seen.insert(pb.name.clone()) {
                bail!("playbook_config_invalid: duplicate playbook name '{}'", pb.name);
            }
            if !pb.scoring_weights.is_normalized() {
                bail!(
                    "playbook_config_invalid: '{}' scoring weights must sum to 1.0",
                    pb.name
                );
            }
            if pb.min_rr <= 0.0 {
                bail!("playbook_config_invalid: '{}' min_rr must be > 0", pb.name);
            }
        }
        Ok(())
    }

    pub fn time_windows_for<'a>(&'a self, pb: &'a Playbook) -> &'a [MinuteWindow] {
        if pb.time_windows.is_empty() {
            &self.default_time_windows
        } else {
            &pb.time_windows
        }
    }
}
