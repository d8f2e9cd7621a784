//! # Cycle & Time Engine
//!
//! Builds the simulation time index and drives the per-cycle operating
//! pattern: a three-mode state machine (injection-heavy, withdrawal-heavy,
//! balanced) with random-walk transitions, a ramped cycle-fraction walk and
//! per-timestep mass allocation under the per-direction capacity cap.

use chrono::{Duration, Months, NaiveDateTime};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::CycleParams;
use crate::error::{GeneratorError, Result};

/// Timestep cadence of the generated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Daily,
    Monthly,
}

impl Frequency {
    /// Parse a configured frequency token.
    pub fn parse(token: &str) -> Result<Self> {
        use std::str::FromStr;
        Frequency::from_str(token).map_err(|_| {
            GeneratorError::config(format!(
                "unrecognized frequency token '{token}' (expected weekly, daily or monthly)"
            ))
        })
    }

    pub fn steps_per_year(&self) -> u32 {
        match self {
            Frequency::Weekly => 52,
            Frequency::Daily => 365,
            Frequency::Monthly => 12,
        }
    }

    /// Timestamp `steps` cadence units after `start`.
    pub fn advance(&self, start: NaiveDateTime, steps: u32) -> NaiveDateTime {
        match self {
            Frequency::Weekly => start + Duration::weeks(steps as i64),
            Frequency::Daily => start + Duration::days(steps as i64),
            Frequency::Monthly => start + Months::new(steps),
        }
    }
}

/// Concrete timestep index for the whole simulation horizon.
pub fn build_time_index(
    start: NaiveDateTime,
    n_years: u32,
    frequency: Frequency,
) -> Vec<NaiveDateTime> {
    let n_steps = n_years * frequency.steps_per_year();
    (0..n_steps).map(|i| frequency.advance(start, i)).collect()
}

/// Operating mode of one storage cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CycleMode {
    InjectionHeavy,
    WithdrawalHeavy,
    Balanced,
}

impl CycleMode {
    pub fn parse(token: &str) -> Result<Self> {
        use std::str::FromStr;
        CycleMode::from_str(token).map_err(|_| {
            GeneratorError::config(format!(
                "unrecognized cycle mode '{token}' \
                 (expected injection_heavy, withdrawal_heavy or balanced)"
            ))
        })
    }

    /// Neighbors in the mode walk. Balanced sits between the two heavy modes.
    pub fn adjacent(&self) -> &'static [CycleMode] {
        match self {
            CycleMode::InjectionHeavy => &[CycleMode::Balanced],
            CycleMode::WithdrawalHeavy => &[CycleMode::Balanced],
            CycleMode::Balanced => &[CycleMode::InjectionHeavy, CycleMode::WithdrawalHeavy],
        }
    }

    const ALL: [CycleMode; 3] = [
        CycleMode::InjectionHeavy,
        CycleMode::WithdrawalHeavy,
        CycleMode::Balanced,
    ];
}

/// Plan for one cycle, fixed at the cycle boundary. Per-step allocation within
/// the cycle is deterministic given the plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePlan {
    pub index: u32,
    pub mode: CycleMode,
    /// Target gross mass for the dominant direction, as a fraction of
    /// working-gas capacity.
    pub fraction: f64,
    pub length_steps: u32,
    /// Counter-flow intensity relative to the dominant direction.
    pub secondary_flow: f64,
    /// Injection/withdrawal asymmetry used in balanced mode.
    pub tilt: f64,
}

/// Per-timestep injection/withdrawal allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepFlows {
    pub injected_kg: f64,
    pub withdrawn_kg: f64,
}

/// Drives mode transitions, cycle-fraction ramping and step allocation.
#[derive(Debug, Clone)]
pub struct CycleEngine {
    params: CycleParams,
}

impl CycleEngine {
    pub fn new(params: CycleParams) -> Self {
        Self { params }
    }

    /// Plan the first cycle. Mode comes from configuration when pinned there,
    /// otherwise it is drawn uniformly; the fraction starts mid-range.
    pub fn initial_plan<R: Rng>(&self, rng: &mut R) -> CyclePlan {
        let mode = match self.params.initial_mode {
            Some(mode) => mode,
            None => CycleMode::ALL[rng.gen_range(0..CycleMode::ALL.len())],
        };
        let fraction = (self.params.fraction_min + self.params.fraction_max) / 2.0;
        self.fill_plan(1, mode, fraction, rng)
    }

    /// Plan the next cycle from the previous one: walk the mode, ramp the
    /// fraction, redraw cycle length and flow shape.
    pub fn next_plan<R: Rng>(&self, prev: &CyclePlan, rng: &mut R) -> CyclePlan {
        let mode = self.next_mode(prev.mode, rng);
        let fraction = self.next_fraction(prev.fraction, mode, rng);
        self.fill_plan(prev.index + 1, mode, fraction, rng)
    }

    fn fill_plan<R: Rng>(
        &self,
        index: u32,
        mode: CycleMode,
        fraction: f64,
        rng: &mut R,
    ) -> CyclePlan {
        let length_steps = self.params.cycle_length_steps.sample(rng);
        let secondary_flow = self.params.secondary_flow_fraction.sample(rng);
        let tilt = if self.params.balanced_tilt > 0.0 {
            rng.gen_range(-self.params.balanced_tilt..=self.params.balanced_tilt)
        } else {
            0.0
        };
        CyclePlan {
            index,
            mode,
            fraction,
            length_steps,
            secondary_flow,
            tilt,
        }
    }

    /// Random-walk mode transition: mostly stay or move to an adjacent mode,
    /// with a small configured probability of an abrupt jump to any mode.
    fn next_mode<R: Rng>(&self, current: CycleMode, rng: &mut R) -> CycleMode {
        if rng.gen::<f64>() < self.params.mode_jump_probability {
            return CycleMode::ALL[rng.gen_range(0..CycleMode::ALL.len())];
        }
        let mut candidates = vec![current];
        let mut weights = vec![self.params.mode_stay_weight];
        for &mode in current.adjacent() {
            candidates.push(mode);
            weights.push(self.params.mode_adjacent_weight);
        }
        // weights validated non-negative and not all zero at resolve time
        let index = WeightedIndex::new(&weights).unwrap();
        candidates[index.sample(rng)]
    }

    /// Bounded random walk on the cycle fraction. The step is gaussian with a
    /// mode-dependent drift: heavy modes push their intensity up, balanced
    /// cycles drift freely.
    fn next_fraction<R: Rng>(&self, prev: f64, mode: CycleMode, rng: &mut R) -> f64 {
        let drift = match mode {
            CycleMode::InjectionHeavy | CycleMode::WithdrawalHeavy => self.params.ramp_bias,
            CycleMode::Balanced => 0.0,
        };
        let step = Normal::new(drift, self.params.ramp_sigma).unwrap().sample(rng);
        (prev + step).clamp(self.params.fraction_min, self.params.fraction_max)
    }

    /// Allocate this step's gross injected/withdrawn mass.
    ///
    /// The cycle's target mass (`fraction × capacity`) is split uniformly
    /// across the cycle's steps; the mode shapes the two directions. The
    /// running per-direction totals are then hard-capped at allocation time:
    /// cumulative injected (and, independently, withdrawn) mass within one
    /// cycle never exceeds `direction_cap_fraction × capacity`.
    pub fn step_flows(
        &self,
        plan: &CyclePlan,
        capacity_kg: f64,
        injected_so_far_kg: f64,
        withdrawn_so_far_kg: f64,
    ) -> StepFlows {
        let per_step = plan.fraction * capacity_kg / plan.length_steps as f64;
        let (gross_injected, gross_withdrawn) = match plan.mode {
            CycleMode::InjectionHeavy => (per_step, per_step * plan.secondary_flow),
            CycleMode::WithdrawalHeavy => (per_step * plan.secondary_flow, per_step),
            CycleMode::Balanced => {
                (per_step * (1.0 + plan.tilt), per_step * (1.0 - plan.tilt))
            }
        };

        let cap_kg = self.params.direction_cap_fraction * capacity_kg;
        let injected_kg = gross_injected
            .min((cap_kg - injected_so_far_kg).max(0.0))
            .max(0.0);
        let withdrawn_kg = gross_withdrawn
            .min((cap_kg - withdrawn_so_far_kg).max(0.0))
            .max(0.0);

        StepFlows {
            injected_kg,
            withdrawn_kg,
        }
    }
}
