use bpd_core::weights::Granularity;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Handling of hours inside the aggregation window with no usable source
/// data. The choice is explicit and recorded in the aggregator output,
/// never decided silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapPolicy {
    /// Gap hours are excluded; any 3-hour block touching one contributes
    /// no weight triple.
    Exclude,
    /// Gap hours are written as explicit zero totals.
    ZeroFill,
}

impl FromStr for GapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclude" => Ok(GapPolicy::Exclude),
            "zero-fill" => Ok(GapPolicy::ZeroFill),
            other => Err(format!(
                "unknown gap policy '{other}' (expected 'exclude' or 'zero-fill')"
            )),
        }
    }
}

/// Configuration surface consumed by the disaggregation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisaggConfig {
    /// Preferred weight-table granularity.
    pub granularity: Granularity,
    /// Base random seed. `None` draws a process seed at run start.
    pub base_seed: Option<u64>,
    /// Whether a month-hour miss may fall back to the month-only key.
    pub fallback_enabled: bool,
    /// Gap handling for the hourly aggregator.
    pub gap_policy: GapPolicy,
}

impl Default for DisaggConfig {
    fn default() -> Self {
        DisaggConfig {
            granularity: Granularity::MonthHour,
            base_seed: None,
            fallback_enabled: true,
            gap_policy: GapPolicy::Exclude,
        }
    }
}

impl DisaggConfig {
    /// The base seed for this run: the configured one, or a process-drawn
    /// seed. Either way it is logged, so any run can be replayed.
    pub fn resolve_base_seed(&self) -> u64 {
        let seed = match self.base_seed {
            Some(s) => s,
            None => rand::thread_rng().gen(),
        };
        log::info!("[bpd] disagg: base seed {}", seed);
        seed
    }
}
