use crate::composer::{MissingPolicy, SCORE_COLUMN};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FearGreedConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub variant: VariantSection,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default = "default_universe_path")]
    pub universe_path: String,
    #[serde(default = "default_index_id")]
    pub index_id: String,
    /// Overrides the variant's own lower bound on trading dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "default_ticker_code_length")]
    pub ticker_code_length: Option<usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            universe_path: default_universe_path(),
            index_id: default_index_id(),
            start_date: None,
            ticker_code_length: default_ticker_code_length(),
        }
    }
}

/// Which pipeline to run, plus optional overrides of its preset parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantSection {
    #[serde(default)]
    pub name: Variant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vix_std_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vix_smooth_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sps_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadth_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_min_periods: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_policy: Option<MissingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    /// Overrides the variant's own cutoff date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<NaiveDate>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            cutoff: None,
        }
    }
}

fn default_index_path() -> String {
    "data/index.csv".to_string()
}

fn default_universe_path() -> String {
    "data/universe.csv".to_string()
}

fn default_index_id() -> String {
    "VNINDEX".to_string()
}

fn default_ticker_code_length() -> Option<usize> {
    Some(3) // listed stock codes; longer codes are funds and warrants
}

fn default_output_path() -> String {
    "fear_greed.csv".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Benchmark momentum and volatility regime only
    MomentumVolatility,
    /// Benchmark momentum and the direction of the cross-sectional average price
    AveragePrice,
    /// Benchmark indicators plus every cross-sectional aggregate
    #[default]
    Full,
}

impl Variant {
    /// Whether the variant reads the constituent universe at all
    pub fn needs_universe(&self) -> bool {
        !matches!(self, Variant::MomentumVolatility)
    }

    pub fn produces(&self, component: Component) -> bool {
        match self {
            Variant::MomentumVolatility => matches!(component, Component::Momentum | Component::Vix),
            Variant::AveragePrice => matches!(component, Component::Momentum | Component::Breadth),
            Variant::Full => true,
        }
    }
}

/// An indicator column that can take part in the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Momentum,
    Vix,
    Breadth,
    Sps,
    RatioTickerUptrend,
}

impl Component {
    pub fn column_name(&self) -> &'static str {
        match self {
            Component::Momentum => "momentum",
            Component::Vix => "vix",
            Component::Breadth => "breadth",
            Component::Sps => "sps",
            Component::RatioTickerUptrend => "ratio_ticker_uptrend",
        }
    }
}

/// Fully resolved parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantConfig {
    pub variant: Variant,
    pub momentum_window: usize,
    pub vix_std_window: usize,
    pub vix_smooth_window: usize,
    pub rsi_span: f64,
    pub rsi_min_periods: usize,
    pub sps_lookback: usize,
    pub sps_window: usize,
    pub breadth_fast_alpha: f64,
    pub breadth_slow_alpha: f64,
    pub breadth_window: usize,
    pub uptrend_window: usize,
    pub price_breadth_window: usize,
    pub rank_window: usize,
    pub rank_min_periods: usize,
    pub components: Vec<Component>,
    pub missing_policy: MissingPolicy,
    /// Value columns written after `trading_date`, in order
    pub output_columns: Vec<String>,
    pub benchmark_column: String,
    pub cutoff: Option<NaiveDate>,
    pub source_start: Option<NaiveDate>,
}

impl VariantConfig {
    pub fn preset(variant: Variant) -> Self {
        let base = Self {
            variant,
            momentum_window: 125,
            vix_std_window: 50,
            vix_smooth_window: 125,
            rsi_span: 13.0,
            rsi_min_periods: 14,
            sps_lookback: 250, // one trading year
            sps_window: 50,
            breadth_fast_alpha: 0.1,
            breadth_slow_alpha: 0.05,
            breadth_window: 25,
            uptrend_window: 20,
            price_breadth_window: 10,
            rank_window: 500,
            rank_min_periods: 500, // a rank needs a full window
            components: vec![
                Component::Momentum,
                Component::Vix,
                Component::RatioTickerUptrend,
                Component::Breadth,
                Component::Sps,
            ],
            missing_policy: MissingPolicy::Skip,
            output_columns: columns(&[SCORE_COLUMN, "vnindex", "rsi"]),
            benchmark_column: "vnindex".to_string(),
            cutoff: NaiveDate::from_ymd_opt(2020, 1, 1),
            source_start: NaiveDate::from_ymd_opt(2015, 1, 1),
        };

        match variant {
            Variant::Full => base,
            Variant::MomentumVolatility => Self {
                momentum_window: 100,
                vix_smooth_window: 100,
                rank_window: 400,
                rank_min_periods: 400,
                components: vec![Component::Momentum, Component::Vix],
                missing_policy: MissingPolicy::Propagate,
                cutoff: None,
                source_start: NaiveDate::from_ymd_opt(2018, 1, 1),
                ..base
            },
            Variant::AveragePrice => Self {
                momentum_window: 200,
                rank_window: 250,
                rank_min_periods: 250,
                components: vec![Component::Momentum, Component::Breadth],
                output_columns: columns(&[SCORE_COLUMN, "vnindex", "avg_price", "breadth"]),
                cutoff: None,
                source_start: None,
                ..base
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("momentum_window", self.momentum_window),
            ("vix_std_window", self.vix_std_window),
            ("vix_smooth_window", self.vix_smooth_window),
            ("rsi_min_periods", self.rsi_min_periods),
            ("sps_lookback", self.sps_lookback),
            ("sps_window", self.sps_window),
            ("breadth_window", self.breadth_window),
            ("uptrend_window", self.uptrend_window),
            ("price_breadth_window", self.price_breadth_window),
            ("rank_window", self.rank_window),
            ("rank_min_periods", self.rank_min_periods),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, size)| *size == 0) {
            return Err(anyhow!("{} must be at least 1", name));
        }
        if self.vix_std_window < 2 {
            return Err(anyhow!("vix_std_window must be at least 2 for a sample deviation"));
        }
        if self.rank_min_periods > self.rank_window {
            return Err(anyhow!(
                "rank_min_periods {} exceeds rank_window {}",
                self.rank_min_periods,
                self.rank_window
            ));
        }

        for (name, alpha) in [
            ("breadth_fast_alpha", self.breadth_fast_alpha),
            ("breadth_slow_alpha", self.breadth_slow_alpha),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(anyhow!("{} must be in (0, 1], got {}", name, alpha));
            }
        }
        if self.rsi_span < 0.0 {
            return Err(anyhow!("rsi_span must not be negative"));
        }

        if self.components.is_empty() {
            return Err(anyhow!("At least one score component is required"));
        }
        if let Some(component) = self.components.iter().find(|c| !self.variant.produces(**c)) {
            return Err(anyhow!(
                "Component {} is not produced by the {:?} variant",
                component.column_name(),
                self.variant
            ));
        }
        Ok(())
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(Component::column_name).collect()
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl FearGreedConfig {
    /// Read a JSON config, using the built-in defaults when the file is absent.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config = match fs::read_to_string(path) {
            Ok(contents) => {
                info!("Loading configuration from {}", path);
                serde_json::from_str(&contents)?
            }
            Err(e) => {
                warn!("Could not read {} ({}), using default configuration", path, e);
                Self::default()
            }
        };

        config.variant_config()?;
        Ok(config)
    }

    /// The variant preset with every configured override applied, validated.
    pub fn variant_config(&self) -> Result<VariantConfig> {
        let section = &self.variant;
        let preset = VariantConfig::preset(section.name);
        let rank_window = section.rank_window.unwrap_or(preset.rank_window);

        let resolved = VariantConfig {
            momentum_window: section.momentum_window.unwrap_or(preset.momentum_window),
            vix_std_window: section.vix_std_window.unwrap_or(preset.vix_std_window),
            vix_smooth_window: section.vix_smooth_window.unwrap_or(preset.vix_smooth_window),
            sps_window: section.sps_window.unwrap_or(preset.sps_window),
            breadth_window: section.breadth_window.unwrap_or(preset.breadth_window),
            rank_window,
            // an overridden window still needs to fill before ranking
            rank_min_periods: section.rank_min_periods.unwrap_or(rank_window),
            missing_policy: section.missing_policy.unwrap_or(preset.missing_policy),
            components: section.components.clone().unwrap_or_else(|| preset.components.clone()),
            cutoff: self.output.cutoff.or(preset.cutoff),
            source_start: self.source.start_date.or(preset.source_start),
            ..preset
        };

        resolved.validate()?;
        Ok(resolved)
    }
}
