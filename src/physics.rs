//! # Storage Physics Primitives
//!
//! Pure functions for the simplified closed-form relationships driving the
//! facility simulation: geothermal temperature, envelope pressure, real-gas
//! PVT capacity derivation, loss fractions, purity mixing and the
//! mass-balance residual. No shared mutable state; every stochastic function
//! takes the caller's generator.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{
    BandConfig, BoundedDistribution, NoiseConfig, PurityParams, ThermoParams,
};
use crate::error::Result;

/// Floor applied to residual denominators so a misconfigured zero capacity
/// cannot divide by zero.
pub const RESIDUAL_EPSILON: f64 = 1e-9;

const MPA_TO_PA: f64 = 1.0e6;
const KELVIN_OFFSET: f64 = 273.15;

/// Temperature at depth from a linear geothermal gradient plus gaussian noise:
///
/// `T = base + gradient * depth_km + N(mean, std)`
///
/// No clamping; implausible values are the concern of downstream validation.
pub fn temperature_at_depth<R: Rng>(
    depth_m: f64,
    base_temperature_c: f64,
    gradient_c_per_km: f64,
    noise: &NoiseConfig,
    rng: &mut R,
) -> f64 {
    let depth_km = depth_m / 1000.0;
    let temperature = base_temperature_c + gradient_c_per_km * depth_km;
    // std validated non-negative at resolve time
    let normal = Normal::new(noise.mean, noise.std).unwrap();
    temperature + normal.sample(rng)
}

/// Pressure from working-gas mass by linear interpolation across the
/// facility's pressure envelope. The fill ratio is clamped into [0, 1] first,
/// which keeps pressure inside [p_min, p_max] even under transient
/// over/under-fill.
pub fn pressure_from_mass(mass_kg: f64, capacity_kg: f64, p_min_mpa: f64, p_max_mpa: f64) -> f64 {
    let ratio = if capacity_kg > 0.0 {
        (mass_kg / capacity_kg).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p_min_mpa + (p_max_mpa - p_min_mpa) * ratio
}

/// Piecewise-constant compressibility factor Z for hydrogen at the given
/// pressure. Segments are `[min, max)`; outside all segments the last one
/// applies.
pub fn compressibility_z(pressure_mpa: f64, thermo: &ThermoParams) -> f64 {
    for seg in &thermo.compressibility_segments {
        if pressure_mpa >= seg.pressure_min_mpa && pressure_mpa < seg.pressure_max_mpa {
            return seg.z;
        }
    }
    // validated non-empty at resolve time
    thermo.compressibility_segments.last().unwrap().z
}

/// Hydrogen mass (kg) from P [MPa], T [°C] and volume [m³] via the real-gas
/// relationship `P·V = Z·n·R·T`.
pub fn mass_from_pvt(
    pressure_mpa: f64,
    temperature_c: f64,
    volume_m3: f64,
    thermo: &ThermoParams,
) -> f64 {
    if volume_m3 <= 0.0 {
        return 0.0;
    }
    let pressure_pa = pressure_mpa * MPA_TO_PA;
    let temperature_k = temperature_c + KELVIN_OFFSET;
    let z = compressibility_z(pressure_mpa, thermo);
    let n_moles = (pressure_pa * volume_m3) / (z * thermo.gas_constant_r * temperature_k);
    (n_moles * thermo.molar_mass_h2).max(0.0)
}

/// Simplified Darcy pressure change [MPa] across reservoir rock:
///
/// `ΔP = (Q · μ · L) / (k · A)`
///
/// with Q in m³/s, μ in cP, L in m, k in mD and A in m². Used to shape
/// plausible porous-reservoir trends, not to solve flow.
pub fn darcy_pressure_change_mpa(
    rate_m3_per_s: f64,
    viscosity_cp: f64,
    length_m: f64,
    permeability_md: f64,
    area_m2: f64,
) -> f64 {
    if rate_m3_per_s <= 0.0 || area_m2 <= 0.0 || permeability_md <= 0.0 {
        return 0.0;
    }
    let mu_pa_s = viscosity_cp * 1.0e-3;
    let k_m2 = permeability_md * 9.869e-16;
    let delta_p_pa = (rate_m3_per_s * mu_pa_s * length_m) / (k_m2 * area_m2);
    (delta_p_pa / MPA_TO_PA).max(0.0)
}

/// Draw a dimensionless loss coefficient from its configured distribution.
/// Bounds are re-checked so a hand-built distribution cannot slip through
/// with min > max or negative values.
pub fn sample_loss_fraction<R: Rng>(
    dist: &BoundedDistribution,
    rng: &mut R,
) -> Result<f64> {
    dist.validate("loss_fraction")?;
    Ok(dist.sample(rng))
}

/// Losses for one step as a proportion of the current working-gas mass.
pub fn compute_cycle_losses(working_gas_kg: f64, loss_fraction: f64) -> f64 {
    if working_gas_kg <= 0.0 || loss_fraction <= 0.0 {
        return 0.0;
    }
    (working_gas_kg * loss_fraction).max(0.0)
}

/// Inlet hydrogen purity [%] drawn from the configured high-purity band.
pub fn sample_inlet_purity<R: Rng>(band: &BandConfig, rng: &mut R) -> f64 {
    band.sample(rng)
}

/// Outlet purity [%]: a mass-flow-weighted blend of inlet and working purity
/// plus a small noise term. Withdrawal-dominated steps track the working gas;
/// injection-dominated steps track the inlet stream.
pub fn update_outlet_purity<R: Rng>(
    working_purity_pct: f64,
    inlet_purity_pct: f64,
    injected_kg: f64,
    withdrawn_kg: f64,
    params: &PurityParams,
    rng: &mut R,
) -> f64 {
    let total_flow = injected_kg + withdrawn_kg;
    let blended = if total_flow > 0.0 {
        let inlet_weight = injected_kg / total_flow;
        inlet_weight * inlet_purity_pct + (1.0 - inlet_weight) * working_purity_pct
    } else {
        working_purity_pct
    };
    let noise = Normal::new(params.outlet_noise.mean, params.outlet_noise.std)
        .unwrap()
        .sample(rng);
    (blended + noise).clamp(0.0, 100.0)
}

/// Working-gas purity [%] after this step's injection, as a mass-weighted
/// average of the stored gas and the injected stream:
///
/// `(prior · current + inlet · injected) / (current + injected)`
///
/// Unchanged when nothing is injected. Repeated injection of slightly impure
/// gas gives the monotonic impurity buildup the dataset is designed to show.
pub fn update_working_purity(
    prior_purity_pct: f64,
    inlet_purity_pct: f64,
    injected_kg: f64,
    current_mass_kg: f64,
) -> f64 {
    if injected_kg <= 0.0 {
        return prior_purity_pct;
    }
    let total = current_mass_kg + injected_kg;
    if total <= 0.0 {
        return inlet_purity_pct.clamp(0.0, 100.0);
    }
    let mixed = (prior_purity_pct * current_mass_kg + inlet_purity_pct * injected_kg) / total;
    mixed.clamp(0.0, 100.0)
}

/// Normalized mass-balance residual for one step:
///
/// `(mass_next - (mass_prev + injected - withdrawn - static - dynamic)) / max(capacity, ε)`
///
/// Zero when the arithmetic update was applied unclamped; nonzero exactly when
/// clamping discarded mass (negative for injection excess, positive for a
/// withdrawal shortfall) or when float noise accumulates. This is the MRV
/// anomaly signal.
pub fn mass_balance_residual(
    mass_next_kg: f64,
    mass_prev_kg: f64,
    injected_kg: f64,
    withdrawn_kg: f64,
    static_loss_kg: f64,
    dynamic_loss_kg: f64,
    capacity_kg: f64,
) -> f64 {
    let expected =
        mass_prev_kg + injected_kg - withdrawn_kg - static_loss_kg - dynamic_loss_kg;
    (mass_next_kg - expected) / capacity_kg.max(RESIDUAL_EPSILON)
}
