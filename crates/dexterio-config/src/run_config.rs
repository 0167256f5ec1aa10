use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use dexterio_schemas::{CommissionModel, SlippageModel, SpreadModel, TradeType, TradingMode};

/// Configuration for a single backtest run, passed to `run()`. Dates are
/// inclusive; date slicing is applied after aggregation warmup. Bar files
/// are located under `data_root` via `dexterio_data::discover_file`'s
/// `SYM.parquet`/`sym.parquet`/legacy-glob fallback chain (§6) — one per
/// entry in `symbols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_name: String,
    pub symbols: Vec<String>,
    pub data_root: PathBuf,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_htf_warmup_days")]
    pub htf_warmup_days: u32,
    pub trading_mode: TradingMode,
    pub trade_types: BTreeSet<TradeType>,
    pub initial_capital: f64,
    pub base_risk_pct: f64,
    pub reduced_risk_pct: f64,
    pub commission_model: CommissionModel,
    #[serde(default)]
    pub enable_reg_fees: bool,
    pub slippage_model: SlippageModel,
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: f64,
    #[serde(default)]
    pub slippage_ticks: u32,
    pub spread_model: SpreadModel,
    #[serde(default)]
    pub spread_bps: f64,
    #[serde(default)]
    pub export_market_state: bool,
    #[serde(default)]
    pub safe_allowlist: BTreeSet<String>,
    #[serde(default)]
    pub aggressive_allowlist: BTreeSet<String>,
    #[serde(default)]
    pub aggressive_denylist: BTreeSet<String>,
    #[serde(default = "default_stop_day_r")]
    pub stop_day_r: f64,
    #[serde(default = "default_stop_run_r")]
    pub stop_run_r: f64,
    #[serde(default = "default_cooldown_min")]
    pub consec_loss_cooldown_min: u32,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    #[serde(default = "default_sweep_tick_threshold")]
    pub sweep_tick_threshold: u32,
}

fn default_htf_warmup_days() -> u32 {
    40
}
fn default_slippage_pct() -> f64 {
    0.0005
}
fn default_stop_day_r() -> f64 {
    -4.0
}
fn default_stop_run_r() -> f64 {
    20.0
}
fn default_cooldown_min() -> u32 {
    30
}
fn default_tick_size() -> f64 {
    0.01
}
fn default_sweep_tick_threshold() -> u32 {
    2
}

impl RunConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        use anyhow::bail;
        if self.symbols.is_empty() {
            bail!("config_invalid: no symbols configured");
        }
        if self.start_date > self.end_date {
            bail!("config_invalid: start_date after end_date");
        }
        if self.initial_capital <= 0.0 {
            bail!("config_invalid: initial_capital must be > 0");
        }
        if self.base_risk_pct <= 0.0 || self.base_risk_pct > 1.0 {
            bail!("config_invalid: base_risk_pct must be in (0, 1]");
        }
        if self.reduced_risk_pct <= 0.0 || self.reduced_risk_pct > self.base_risk_pct {
            bail!("config_invalid: reduced_risk_pct must be in (0, base_risk_pct]");
        }
        if self.trade_types.is_empty() {
            bail!("config_invalid: trade_types must be non-empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn base_config() -> RunConfig {
        RunConfig {
            run_name: "test".into(),
            symbols: vec!["SPY".into()],
            data_root: PathBuf::from("data/historical/1m"),
            start_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            htf_warmup_days: 40,
            trading_mode: TradingMode::Aggressive,
            trade_types: BTreeSet::from([TradeType::Daily, TradeType::Scalp]),
            initial_capital: 50_000.0,
            base_risk_pct: 0.02,
            reduced_risk_pct: 0.01,
            commission_model: CommissionModel::IbkrFixed,
            enable_reg_fees: true,
            slippage_model: SlippageModel::Pct,
            slippage_pct: 0.0005,
            slippage_ticks: 0,
            spread_model: SpreadModel::FixedBps,
            spread_bps: 2.0,
            export_market_state: false,
            safe_allowlist: BTreeSet::new(),
            aggressive_allowlist: BTreeSet::new(),
            aggressive_denylist: BTreeSet::new(),
            stop_day_r: -4.0,
            stop_run_r: 20.0,
            consec_loss_cooldown_min: 30,
            tick_size: 0.01,
            sweep_tick_threshold: 2,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn inverted_date_range_rejected() {
        let mut cfg = base_config();
        cfg.start_date = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn reduced_risk_above_base_rejected() {
        let mut cfg = base_config();
        cfg.reduced_risk_pct = 0.05;
        assert!(cfg.validate().is_err());
    }
}
