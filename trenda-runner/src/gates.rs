//! Signal gates: cheap pre-scoring checks on a detected pattern.
//!
//! Gates run in order and the first failure wins. A rejected pattern is a
//! normal outcome and is reported with the gate name and reason.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use trenda_core::domain::{Timeframe, TrendDirection};
use trenda_core::entry::HtfContext;

/// What a gate sees about a candidate entry.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub direction: TrendDirection,
    pub signal_time: DateTime<Utc>,
    pub htf: &'a HtfContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRejection {
    pub gate: String,
    pub reason: String,
}

/// Trait for signal gates.
///
/// Gates evaluate market context only; they never touch stores or positions.
pub trait SignalGate: Send + Sync {
    fn name(&self) -> &str;

    /// `Err(reason)` when the pattern must be dropped.
    fn check(&self, input: &GateInput<'_>) -> Result<(), String>;
}

/// Signal time must fall within `[start_hour, end_hour]` UTC, inclusive.
#[derive(Debug, Clone)]
pub struct TimeOfDayGate {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SignalGate for TimeOfDayGate {
    fn name(&self) -> &str {
        "time_of_day"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), String> {
        let hour = input.signal_time.hour();
        if (self.start_hour..=self.end_hour).contains(&hour) {
            Ok(())
        } else {
            Err(format!(
                "hour {hour:02} UTC outside {:02}-{:02}",
                self.start_hour, self.end_hour
            ))
        }
    }
}

/// Drops patterns whose first disagreeing alignment timeframe is excluded.
#[derive(Debug, Clone)]
pub struct TimeframeConflictGate {
    pub excluded: Vec<Timeframe>,
}

impl SignalGate for TimeframeConflictGate {
    fn name(&self) -> &str {
        "timeframe_conflict"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), String> {
        match input.htf.conflicted_timeframe {
            Some(tf) if self.excluded.contains(&tf) => Err(format!("conflicted timeframe {tf}")),
            _ => Ok(()),
        }
    }
}

/// Price must sit at the discount (longs) or premium (shorts) end of the
/// daily and weekly ranges. An unknown position fails.
#[derive(Debug, Clone)]
pub struct HtfRangeGate {
    pub bullish_daily_max: f64,
    pub bullish_weekly_max: f64,
    pub bearish_daily_min: f64,
    pub bearish_weekly_min: f64,
}

impl SignalGate for HtfRangeGate {
    fn name(&self) -> &str {
        "htf_range"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), String> {
        let (Some(daily), Some(weekly)) = (input.htf.daily_position, input.htf.weekly_position) else {
            return Err("daily or weekly range position unknown".into());
        };
        let ok = match input.direction {
            TrendDirection::Bullish => daily <= self.bullish_daily_max && weekly <= self.bullish_weekly_max,
            TrendDirection::Bearish => daily >= self.bearish_daily_min && weekly >= self.bearish_weekly_min,
            TrendDirection::Neutral => false,
        };
        if ok {
            Ok(())
        } else {
            Err(format!(
                "{} entry at daily {daily:.2} / weekly {weekly:.2}",
                input.direction
            ))
        }
    }
}

/// Nearest HTF obstacle must be at least `min_distance_atr` away.
#[derive(Debug, Clone)]
pub struct ObstacleGate {
    pub min_distance_atr: f64,
}

impl SignalGate for ObstacleGate {
    fn name(&self) -> &str {
        "obstacle_clearance"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), String> {
        match input.htf.obstacle_distance_atr {
            Some(d) if d >= self.min_distance_atr => Ok(()),
            Some(d) => Err(format!("obstacle {d:.2} ATR away, need {:.2}", self.min_distance_atr)),
            None => Err("obstacle distance unknown (ATR not positive)".into()),
        }
    }
}

/// Ordered gate list.
pub struct GateSet {
    gates: Vec<Box<dyn SignalGate>>,
}

impl GateSet {
    pub fn new(gates: Vec<Box<dyn SignalGate>>) -> Self {
        Self { gates }
    }

    /// Pass-through: no gates.
    pub fn open() -> Self {
        Self { gates: Vec::new() }
    }

    pub fn names(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// The first failing gate, if any.
    pub fn check(&self, input: &GateInput<'_>) -> Result<(), GateRejection> {
        for gate in &self.gates {
            gate.check(input).map_err(|reason| GateRejection {
                gate: gate.name().to_string(),
                reason,
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for GateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateSet").field("gates", &self.names()).finish()
    }
}

/// Serializable gate settings. A `None` section disables that gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub trading_hours: Option<(u32, u32)>,
    pub excluded_conflicts: Vec<Timeframe>,
    pub htf_range: Option<HtfRangeThresholds>,
    pub min_obstacle_distance_atr: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtfRangeThresholds {
    pub bullish_daily_max: f64,
    pub bullish_weekly_max: f64,
    pub bearish_daily_min: f64,
    pub bearish_weekly_min: f64,
}

impl Default for HtfRangeThresholds {
    fn default() -> Self {
        Self {
            bullish_daily_max: 0.33,
            bullish_weekly_max: 0.50,
            bearish_daily_min: 0.67,
            bearish_weekly_min: 0.50,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            trading_hours: Some((4, 15)),
            excluded_conflicts: vec![Timeframe::H4],
            htf_range: Some(HtfRangeThresholds::default()),
            min_obstacle_distance_atr: Some(1.0),
        }
    }
}

impl GateConfig {
    /// Gates in evaluation order: time, conflict, range, obstacle.
    pub fn build(&self) -> GateSet {
        let mut gates: Vec<Box<dyn SignalGate>> = Vec::new();
        if let Some((start_hour, end_hour)) = self.trading_hours {
            gates.push(Box::new(TimeOfDayGate { start_hour, end_hour }));
        }
        if !self.excluded_conflicts.is_empty() {
            gates.push(Box::new(TimeframeConflictGate {
                excluded: self.excluded_conflicts.clone(),
            }));
        }
        if let Some(t) = self.htf_range {
            gates.push(Box::new(HtfRangeGate {
                bullish_daily_max: t.bullish_daily_max,
                bullish_weekly_max: t.bullish_weekly_max,
                bearish_daily_min: t.bearish_daily_min,
                bearish_weekly_min: t.bearish_weekly_min,
            }));
        }
        if let Some(min_distance_atr) = self.min_obstacle_distance_atr {
            gates.push(Box::new(ObstacleGate { min_distance_atr }));
        }
        GateSet::new(gates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn htf(daily: Option<f64>, weekly: Option<f64>, distance: Option<f64>) -> HtfContext {
        HtfContext {
            daily_position: daily,
            weekly_position: weekly,
            nearest_obstacle: None,
            obstacle_distance_atr: distance,
            conflicted_timeframe: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, hour, 0, 0).unwrap()
    }

    #[test]
    fn default_gates_in_order() {
        let set = GateConfig::default().build();
        assert_eq!(
            set.names(),
            vec!["time_of_day", "timeframe_conflict", "htf_range", "obstacle_clearance"]
        );
    }

    #[test]
    fn time_of_day_bounds_are_inclusive() {
        let gate = TimeOfDayGate { start_hour: 4, end_hour: 15 };
        let ctx = htf(None, None, None);
        let input = |h| GateInput {
            direction: TrendDirection::Bullish,
            signal_time: at(h),
            htf: &ctx,
        };
        assert!(gate.check(&input(4)).is_ok());
        assert!(gate.check(&input(15)).is_ok());
        assert!(gate.check(&input(3)).is_err());
        assert!(gate.check(&input(16)).is_err());
    }

    #[test]
    fn conflict_gate_only_blocks_excluded() {
        let gate = TimeframeConflictGate { excluded: vec![Timeframe::H4] };
        let mut ctx = htf(None, None, None);
        ctx.conflicted_timeframe = Some(Timeframe::W1);
        let input = GateInput {
            direction: TrendDirection::Bearish,
            signal_time: at(10),
            htf: &ctx,
        };
        assert!(gate.check(&input).is_ok());

        let mut ctx = htf(None, None, None);
        ctx.conflicted_timeframe = Some(Timeframe::H4);
        let input = GateInput { htf: &ctx, ..input };
        assert!(gate.check(&input).is_err());
    }

    #[test]
    fn htf_range_gate_by_direction() {
        let t = HtfRangeThresholds::default();
        let gate = HtfRangeGate {
            bullish_daily_max: t.bullish_daily_max,
            bullish_weekly_max: t.bullish_weekly_max,
            bearish_daily_min: t.bearish_daily_min,
            bearish_weekly_min: t.bearish_weekly_min,
        };
        let check = |dir, d, w| {
            let ctx = htf(d, w, Some(5.0));
            gate.check(&GateInput {
                direction: dir,
                signal_time: at(10),
                htf: &ctx,
            })
        };
        assert!(check(TrendDirection::Bullish, Some(0.20), Some(0.50)).is_ok());
        assert!(check(TrendDirection::Bullish, Some(0.34), Some(0.10)).is_err());
        assert!(check(TrendDirection::Bearish, Some(0.67), Some(0.50)).is_ok());
        assert!(check(TrendDirection::Bearish, Some(0.80), Some(0.49)).is_err());
        assert!(check(TrendDirection::Bearish, None, Some(0.90)).is_err());
    }

    #[test]
    fn obstacle_gate_needs_known_distance() {
        let gate = ObstacleGate { min_distance_atr: 1.0 };
        let check = |d| {
            let ctx = htf(None, None, d);
            gate.check(&GateInput {
                direction: TrendDirection::Bullish,
                signal_time: at(10),
                htf: &ctx,
            })
        };
        assert!(check(Some(1.0)).is_ok());
        assert!(check(Some(0.99)).is_err());
        assert!(check(None).is_err());
    }

    #[test]
    fn first_failure_short_circuits() {
        let set = GateConfig::default().build();
        // Outside hours and no HTF data: the time gate reports first.
        let ctx = htf(None, None, None);
        let err = set
            .check(&GateInput {
                direction: TrendDirection::Bullish,
                signal_time: at(20),
                htf: &ctx,
            })
            .unwrap_err();
        assert_eq!(err.gate, "time_of_day");

        assert!(GateSet::open()
            .check(&GateInput {
                direction: TrendDirection::Bullish,
                signal_time: at(20),
                htf: &ctx,
            })
            .is_ok());
    }
}
