//! Configuration loading and resolution.
//!
//! Raw settings come from `config/default.toml` merged with `UHS__`-prefixed
//! environment variables. [`Config::resolve`] validates everything eagerly and
//! produces the typed parameter bundles consumed by the sampler, the cycle
//! engine and the facility simulator. A bad value fails the whole run before
//! any facility is sampled.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use rand::Rng;
use serde::Deserialize;

use crate::cycle::{CycleMode, Frequency};
use crate::error::{GeneratorError, Result};
use crate::metadata::ReservoirKind;

/// Inclusive numeric range used for uniform sampling and band checks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(GeneratorError::config(format!("{name}: bounds must be finite")));
        }
        if self.min > self.max {
            return Err(GeneratorError::config(format!(
                "{name}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Integer range, inclusive on both ends.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StepRange {
    pub min: u32,
    pub max: u32,
}

impl StepRange {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.min == 0 {
            return Err(GeneratorError::config(format!("{name}: min must be at least 1")));
        }
        if self.min > self.max {
            return Err(GeneratorError::config(format!(
                "{name}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

/// A bounded scalar distribution for loss coefficients and similar knobs.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum BoundedDistribution {
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std: f64, min: f64, max: f64 },
}

impl BoundedDistribution {
    pub fn validate(&self, name: &str) -> Result<()> {
        let (min, max) = self.bounds();
        if !min.is_finite() || !max.is_finite() {
            return Err(GeneratorError::config(format!("{name}: bounds must be finite")));
        }
        if min > max {
            return Err(GeneratorError::config(format!(
                "{name}: min {min} exceeds max {max}"
            )));
        }
        if min < 0.0 {
            return Err(GeneratorError::config(format!(
                "{name}: negative lower bound {min}"
            )));
        }
        if let BoundedDistribution::Normal { std, .. } = self {
            if *std < 0.0 || !std.is_finite() {
                return Err(GeneratorError::config(format!(
                    "{name}: invalid standard deviation {std}"
                )));
            }
        }
        Ok(())
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            BoundedDistribution::Uniform { min, max } => (*min, *max),
            BoundedDistribution::Normal { min, max, .. } => (*min, *max),
        }
    }

    /// Draw one value, clipped to the configured bounds.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            BoundedDistribution::Uniform { min, max } => {
                if max <= min {
                    *min
                } else {
                    rng.gen_range(*min..=*max)
                }
            }
            BoundedDistribution::Normal { mean, std, min, max } => {
                use rand_distr::{Distribution, Normal};
                // std validated non-negative at resolve time
                let normal = Normal::new(*mean, *std).unwrap();
                normal.sample(rng).clamp(*min, *max)
            }
        }
    }
}

/// Lognormal distribution clipped to [min, max]; `mean` is the linear-space
/// median (the draw is `exp(N(ln mean, sigma))`).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogNormalBounded {
    pub mean: f64,
    pub sigma: f64,
    pub min: f64,
    pub max: f64,
}

impl LogNormalBounded {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.mean <= 0.0 || !self.mean.is_finite() {
            return Err(GeneratorError::config(format!(
                "{name}: lognormal mean must be positive, got {}",
                self.mean
            )));
        }
        if self.sigma < 0.0 || !self.sigma.is_finite() {
            return Err(GeneratorError::config(format!(
                "{name}: invalid sigma {}",
                self.sigma
            )));
        }
        if self.min > self.max || self.min < 0.0 {
            return Err(GeneratorError::config(format!(
                "{name}: invalid bounds [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        use rand_distr::{Distribution, LogNormal};
        let lognormal = LogNormal::new(self.mean.ln(), self.sigma).unwrap();
        lognormal.sample(rng).clamp(self.min, self.max)
    }
}

/// Mean/std pair for additive gaussian noise terms.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NoiseConfig {
    pub mean: f64,
    pub std: f64,
}

impl NoiseConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.std < 0.0 || !self.std.is_finite() || !self.mean.is_finite() {
            return Err(GeneratorError::config(format!(
                "{name}: invalid noise parameters (mean {}, std {})",
                self.mean, self.std
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Raw configuration (mirrors config/default.toml)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub global: GlobalConfig,
    pub thermodynamics: ThermoConfig,
    pub facility_types: FacilityTypesConfig,
    pub losses: LossConfig,
    pub purity: PurityConfig,
    pub cycling: CyclingConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    pub n_facilities: usize,
    pub random_seed: u64,
    pub start_date: String,
    pub n_years: u32,
    pub frequency: String,
    pub initial_fill_fraction: f64,
    pub initial_purity_pct: f64,
    pub output_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermoConfig {
    pub gas_constant_r_j_per_mol_k: f64,
    pub molar_mass_h2_kg_per_mol: f64,
    pub temperature_noise_c: NoiseConfig,
    pub compressibility_segments: Vec<ZSegment>,
}

/// Piecewise-constant compressibility factor segment, `[min, max)` in MPa.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ZSegment {
    pub pressure_min_mpa: f64,
    pub pressure_max_mpa: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilityTypesConfig {
    pub salt_cavern: FacilityTypeConfig,
    pub depleted_reservoir: FacilityTypeConfig,
    pub aquifer: FacilityTypeConfig,
    pub porous_reservoir: FacilityTypeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilityTypeConfig {
    pub weight: f64,
    pub depth_m: Range,
    pub pressure_min_mpa: f64,
    pub pressure_max_mpa: f64,
    pub base_temperature_c: f64,
    pub temperature_gradient_c_per_km: f64,
    pub working_gas_fraction: f64,
    pub storage_volume_m3: LogNormalBounded,
    pub porosity: Option<Range>,
    pub permeability_md: Option<LogNormalBounded>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LossConfig {
    pub static_fraction: BoundedDistribution,
    pub dynamic_fraction: BoundedDistribution,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurityConfig {
    pub inlet_pct: BandConfig,
    pub outlet_noise_pct: NoiseConfig,
}

/// Normal distribution clipped to a [min, max] band.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BandConfig {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl BandConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(GeneratorError::config(format!(
                "{name}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        if self.std < 0.0 || !self.std.is_finite() {
            return Err(GeneratorError::config(format!(
                "{name}: invalid standard deviation {}",
                self.std
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        use rand_distr::{Distribution, Normal};
        let normal = Normal::new(self.mean, self.std).unwrap();
        normal.sample(rng).clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CyclingConfig {
    pub fraction_min: f64,
    pub fraction_max: f64,
    pub ramp_sigma: f64,
    pub ramp_bias: f64,
    pub mode_stay_weight: f64,
    pub mode_adjacent_weight: f64,
    pub mode_jump_probability: f64,
    pub initial_mode: Option<String>,
    pub cycle_length_steps: StepRange,
    pub secondary_flow_fraction: Range,
    pub balanced_tilt: f64,
    pub direction_cap_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    pub pressure_margin_mpa: f64,
    pub temperature_c: Range,
    pub purity_pct: Range,
    pub loss_fraction: Range,
    pub mass_balance_tolerance_fraction: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("UHS__").split("__"));
        figment
            .extract()
            .map_err(|e| GeneratorError::config(e.to_string()))
    }

    /// Validate everything and build the typed parameter bundles.
    pub fn resolve(&self) -> Result<GeneratorParams> {
        let run = self.resolve_run()?;
        let thermo = self.resolve_thermo()?;
        let losses = self.resolve_losses()?;
        let purity = self.resolve_purity()?;
        let cycling = self.resolve_cycling()?;
        let facility_types = self.resolve_facility_types()?;
        let validation = self.resolve_validation()?;

        Ok(GeneratorParams {
            run,
            thermo,
            temperature_noise: self.thermodynamics.temperature_noise_c,
            losses,
            purity,
            cycling,
            facility_types,
            validation,
        })
    }

    fn resolve_run(&self) -> Result<RunParams> {
        let g = &self.global;
        if g.n_facilities == 0 {
            return Err(GeneratorError::config("global.n_facilities must be at least 1"));
        }
        if g.n_years == 0 {
            return Err(GeneratorError::config("global.n_years must be at least 1"));
        }
        if !(0.0..=1.0).contains(&g.initial_fill_fraction) {
            return Err(GeneratorError::config(format!(
                "global.initial_fill_fraction must be in [0, 1], got {}",
                g.initial_fill_fraction
            )));
        }
        if !(0.0..=100.0).contains(&g.initial_purity_pct) {
            return Err(GeneratorError::config(format!(
                "global.initial_purity_pct must be in [0, 100], got {}",
                g.initial_purity_pct
            )));
        }
        let frequency = Frequency::parse(&g.frequency)?;
        let start = NaiveDate::from_str(&g.start_date)
            .map_err(|e| {
                GeneratorError::config(format!("global.start_date '{}': {e}", g.start_date))
            })?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| GeneratorError::config("global.start_date: invalid midnight"))?;

        Ok(RunParams {
            n_facilities: g.n_facilities,
            random_seed: g.random_seed,
            start,
            n_years: g.n_years,
            frequency,
            initial_fill_fraction: g.initial_fill_fraction,
            initial_purity_pct: g.initial_purity_pct,
            output_dir: PathBuf::from(&g.output_dir),
        })
    }

    fn resolve_thermo(&self) -> Result<ThermoParams> {
        let t = &self.thermodynamics;
        if t.gas_constant_r_j_per_mol_k <= 0.0 || t.molar_mass_h2_kg_per_mol <= 0.0 {
            return Err(GeneratorError::config(
                "thermodynamics: gas constant and molar mass must be positive",
            ));
        }
        t.temperature_noise_c.validate("thermodynamics.temperature_noise_c")?;
        if t.compressibility_segments.is_empty() {
            return Err(GeneratorError::config(
                "thermodynamics.compressibility_segments must not be empty",
            ));
        }
        for seg in &t.compressibility_segments {
            if seg.pressure_min_mpa >= seg.pressure_max_mpa || seg.z <= 0.0 {
                return Err(GeneratorError::config(format!(
                    "thermodynamics: invalid compressibility segment [{}, {}) z={}",
                    seg.pressure_min_mpa, seg.pressure_max_mpa, seg.z
                )));
            }
        }
        Ok(ThermoParams {
            gas_constant_r: t.gas_constant_r_j_per_mol_k,
            molar_mass_h2: t.molar_mass_h2_kg_per_mol,
            compressibility_segments: t.compressibility_segments.clone(),
        })
    }

    fn resolve_losses(&self) -> Result<LossParams> {
        self.losses.static_fraction.validate("losses.static_fraction")?;
        self.losses.dynamic_fraction.validate("losses.dynamic_fraction")?;
        Ok(LossParams {
            static_fraction: self.losses.static_fraction,
            dynamic_fraction: self.losses.dynamic_fraction,
        })
    }

    fn resolve_purity(&self) -> Result<PurityParams> {
        let p = &self.purity;
        p.inlet_pct.validate("purity.inlet_pct")?;
        if p.inlet_pct.min < 0.0 || p.inlet_pct.max > 100.0 {
            return Err(GeneratorError::config(format!(
                "purity.inlet_pct band [{}, {}] must lie within [0, 100]",
                p.inlet_pct.min, p.inlet_pct.max
            )));
        }
        p.outlet_noise_pct.validate("purity.outlet_noise_pct")?;
        Ok(PurityParams {
            inlet: p.inlet_pct,
            outlet_noise: p.outlet_noise_pct,
        })
    }

    fn resolve_cycling(&self) -> Result<CycleParams> {
        let c = &self.cycling;
        if !(0.0 < c.fraction_min && c.fraction_min < c.fraction_max && c.fraction_max <= 1.0) {
            return Err(GeneratorError::config(format!(
                "cycling: fraction bounds [{}, {}] must satisfy 0 < min < max <= 1",
                c.fraction_min, c.fraction_max
            )));
        }
        if c.ramp_sigma < 0.0 || c.ramp_bias < 0.0 {
            return Err(GeneratorError::config(
                "cycling: ramp_sigma and ramp_bias must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&c.mode_jump_probability) {
            return Err(GeneratorError::config(format!(
                "cycling.mode_jump_probability must be in [0, 1], got {}",
                c.mode_jump_probability
            )));
        }
        if c.mode_stay_weight < 0.0
            || c.mode_adjacent_weight < 0.0
            || c.mode_stay_weight + c.mode_adjacent_weight <= 0.0
        {
            return Err(GeneratorError::config(
                "cycling: mode stay/adjacent weights must be non-negative and not both zero",
            ));
        }
        c.cycle_length_steps.validate("cycling.cycle_length_steps")?;
        c.secondary_flow_fraction.validate("cycling.secondary_flow_fraction")?;
        if c.secondary_flow_fraction.min < 0.0 || c.secondary_flow_fraction.max > 1.0 {
            return Err(GeneratorError::config(
                "cycling.secondary_flow_fraction must lie within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&c.balanced_tilt) {
            return Err(GeneratorError::config(format!(
                "cycling.balanced_tilt must be in [0, 1], got {}",
                c.balanced_tilt
            )));
        }
        if !(0.0 < c.direction_cap_fraction && c.direction_cap_fraction <= 1.0) {
            return Err(GeneratorError::config(format!(
                "cycling.direction_cap_fraction must be in (0, 1], got {}",
                c.direction_cap_fraction
            )));
        }
        let initial_mode = match &c.initial_mode {
            Some(token) => Some(CycleMode::parse(token)?),
            None => None,
        };
        Ok(CycleParams {
            fraction_min: c.fraction_min,
            fraction_max: c.fraction_max,
            ramp_sigma: c.ramp_sigma,
            ramp_bias: c.ramp_bias,
            mode_stay_weight: c.mode_stay_weight,
            mode_adjacent_weight: c.mode_adjacent_weight,
            mode_jump_probability: c.mode_jump_probability,
            initial_mode,
            cycle_length_steps: c.cycle_length_steps,
            secondary_flow_fraction: c.secondary_flow_fraction,
            balanced_tilt: c.balanced_tilt,
            direction_cap_fraction: c.direction_cap_fraction,
        })
    }

    fn resolve_facility_types(&self) -> Result<Vec<FacilityTypeParams>> {
        let ft = &self.facility_types;
        let sections = [
            (ReservoirKind::SaltCavern, &ft.salt_cavern),
            (ReservoirKind::DepletedReservoir, &ft.depleted_reservoir),
            (ReservoirKind::Aquifer, &ft.aquifer),
            (ReservoirKind::PorousReservoir, &ft.porous_reservoir),
        ];

        let mut resolved = Vec::with_capacity(sections.len());
        let mut total_weight = 0.0;
        for (kind, cfg) in sections {
            let name = format!("facility_types.{kind}");
            if cfg.weight < 0.0 || !cfg.weight.is_finite() {
                return Err(GeneratorError::config(format!("{name}.weight must be >= 0")));
            }
            total_weight += cfg.weight;
            cfg.depth_m.validate(&format!("{name}.depth_m"))?;
            if cfg.pressure_min_mpa >= cfg.pressure_max_mpa {
                return Err(GeneratorError::config(format!(
                    "{name}: pressure_min_mpa {} must be below pressure_max_mpa {}",
                    cfg.pressure_min_mpa, cfg.pressure_max_mpa
                )));
            }
            if !(0.0 < cfg.working_gas_fraction && cfg.working_gas_fraction <= 1.0) {
                return Err(GeneratorError::config(format!(
                    "{name}.working_gas_fraction must be in (0, 1], got {}",
                    cfg.working_gas_fraction
                )));
            }
            cfg.storage_volume_m3.validate(&format!("{name}.storage_volume_m3"))?;
            if kind.is_porous() {
                let porosity = cfg.porosity.ok_or_else(|| {
                    GeneratorError::config(format!("{name}: porosity is required"))
                })?;
                porosity.validate(&format!("{name}.porosity"))?;
                if porosity.min < 0.0 || porosity.max > 1.0 {
                    return Err(GeneratorError::config(format!(
                        "{name}.porosity must lie within [0, 1]"
                    )));
                }
                let permeability = cfg.permeability_md.ok_or_else(|| {
                    GeneratorError::config(format!("{name}: permeability_md is required"))
                })?;
                permeability.validate(&format!("{name}.permeability_md"))?;
            }
            resolved.push(FacilityTypeParams {
                kind,
                weight: cfg.weight,
                depth_m: cfg.depth_m,
                pressure_min_mpa: cfg.pressure_min_mpa,
                pressure_max_mpa: cfg.pressure_max_mpa,
                base_temperature_c: cfg.base_temperature_c,
                temperature_gradient_c_per_km: cfg.temperature_gradient_c_per_km,
                working_gas_fraction: cfg.working_gas_fraction,
                storage_volume_m3: cfg.storage_volume_m3,
                porosity: if kind.is_porous() { cfg.porosity } else { None },
                permeability_md: if kind.is_porous() { cfg.permeability_md } else { None },
            });
        }
        if total_weight <= 0.0 {
            return Err(GeneratorError::config(
                "facility_types: at least one type weight must be positive",
            ));
        }
        Ok(resolved)
    }

    fn resolve_validation(&self) -> Result<ValidationParams> {
        let v = &self.validation;
        if v.pressure_margin_mpa < 0.0 {
            return Err(GeneratorError::config(
                "validation.pressure_margin_mpa must be non-negative",
            ));
        }
        v.temperature_c.validate("validation.temperature_c")?;
        v.purity_pct.validate("validation.purity_pct")?;
        v.loss_fraction.validate("validation.loss_fraction")?;
        if v.mass_balance_tolerance_fraction < 0.0 {
            return Err(GeneratorError::config(
                "validation.mass_balance_tolerance_fraction must be non-negative",
            ));
        }
        Ok(ValidationParams {
            pressure_margin_mpa: v.pressure_margin_mpa,
            temperature_c: v.temperature_c,
            purity_pct: v.purity_pct,
            loss_fraction: v.loss_fraction,
            mass_balance_tolerance_fraction: v.mass_balance_tolerance_fraction,
        })
    }
}

// ============================================================================
// Resolved parameter bundles
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorParams {
    pub run: RunParams,
    pub thermo: ThermoParams,
    pub temperature_noise: NoiseConfig,
    pub losses: LossParams,
    pub purity: PurityParams,
    pub cycling: CycleParams,
    pub facility_types: Vec<FacilityTypeParams>,
    pub validation: ValidationParams,
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub n_facilities: usize,
    pub random_seed: u64,
    pub start: NaiveDateTime,
    pub n_years: u32,
    pub frequency: Frequency,
    pub initial_fill_fraction: f64,
    pub initial_purity_pct: f64,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ThermoParams {
    pub gas_constant_r: f64,
    pub molar_mass_h2: f64,
    pub compressibility_segments: Vec<ZSegment>,
}

#[derive(Debug, Clone, Copy)]
pub struct LossParams {
    pub static_fraction: BoundedDistribution,
    pub dynamic_fraction: BoundedDistribution,
}

#[derive(Debug, Clone, Copy)]
pub struct PurityParams {
    pub inlet: BandConfig,
    pub outlet_noise: NoiseConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct CycleParams {
    pub fraction_min: f64,
    pub fraction_max: f64,
    pub ramp_sigma: f64,
    pub ramp_bias: f64,
    pub mode_stay_weight: f64,
    pub mode_adjacent_weight: f64,
    pub mode_jump_probability: f64,
    pub initial_mode: Option<CycleMode>,
    pub cycle_length_steps: StepRange,
    pub secondary_flow_fraction: Range,
    pub balanced_tilt: f64,
    pub direction_cap_fraction: f64,
}

#[derive(Debug, Clone)]
pub struct FacilityTypeParams {
    pub kind: ReservoirKind,
    pub weight: f64,
    pub depth_m: Range,
    pub pressure_min_mpa: f64,
    pub pressure_max_mpa: f64,
    pub base_temperature_c: f64,
    pub temperature_gradient_c_per_km: f64,
    pub working_gas_fraction: f64,
    pub storage_volume_m3: LogNormalBounded,
    pub porosity: Option<Range>,
    pub permeability_md: Option<LogNormalBounded>,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationParams {
    pub pressure_margin_mpa: f64,
    pub temperature_c: Range,
    pub purity_pct: Range,
    pub loss_fraction: Range,
    pub mass_balance_tolerance_fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_range_validation() {
        assert!(Range { min: 1.0, max: 2.0 }.validate("x").is_ok());
        assert!(Range { min: 2.0, max: 1.0 }.validate("x").is_err());
        assert!(Range { min: f64::NAN, max: 1.0 }.validate("x").is_err());
    }

    #[test]
    fn test_bounded_distribution_rejects_invalid_bounds() {
        let dist = BoundedDistribution::Uniform { min: 0.5, max: 0.1 };
        assert!(dist.validate("losses").is_err());

        let dist = BoundedDistribution::Uniform { min: -0.1, max: 0.1 };
        assert!(dist.validate("losses").is_err());
    }

    #[test]
    fn test_degenerate_uniform_returns_point_value() {
        let dist = BoundedDistribution::Uniform { min: 0.0, max: 0.0 };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(dist.sample(&mut rng), 0.0);
    }

    #[test]
    fn test_normal_sample_respects_bounds() {
        let dist = BoundedDistribution::Normal {
            mean: 0.0003,
            std: 0.01,
            min: 0.0001,
            max: 0.0005,
        };
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = dist.sample(&mut rng);
            assert!((0.0001..=0.0005).contains(&v));
        }
    }

    #[test]
    fn test_lognormal_bounded_sample() {
        let dist = LogNormalBounded {
            mean: 500_000.0,
            sigma: 0.4,
            min: 100_000.0,
            max: 1_500_000.0,
        };
        assert!(dist.validate("volume").is_ok());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let v = dist.sample(&mut rng);
            assert!((100_000.0..=1_500_000.0).contains(&v));
        }
    }

    #[test]
    fn test_step_range_rejects_zero_min() {
        assert!(StepRange { min: 0, max: 4 }.validate("cycle").is_err());
        assert!(StepRange { min: 2, max: 8 }.validate("cycle").is_ok());
    }
}
