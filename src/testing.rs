//! Shared fixtures for unit tests.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::{
    BandConfig, BoundedDistribution, CycleParams, FacilityTypeParams, GeneratorParams,
    LogNormalBounded, LossParams, NoiseConfig, PurityParams, Range, RunParams, StepRange,
    ThermoParams, ValidationParams, ZSegment,
};
use crate::cycle::{CycleMode, Frequency};
use crate::metadata::{FacilityRecord, ReservoirKind};

fn porous_type(
    kind: ReservoirKind,
    weight: f64,
    depth: (f64, f64),
    pressure: (f64, f64),
) -> FacilityTypeParams {
    FacilityTypeParams {
        kind,
        weight,
        depth_m: Range { min: depth.0, max: depth.1 },
        pressure_min_mpa: pressure.0,
        pressure_max_mpa: pressure.1,
        base_temperature_c: 14.0,
        temperature_gradient_c_per_km: 30.0,
        working_gas_fraction: 0.45,
        storage_volume_m3: LogNormalBounded {
            mean: 800_000.0,
            sigma: 0.5,
            min: 250_000.0,
            max: 2_500_000.0,
        },
        porosity: Some(Range { min: 0.12, max: 0.30 }),
        permeability_md: Some(LogNormalBounded {
            mean: 80.0,
            sigma: 0.8,
            min: 5.0,
            max: 500.0,
        }),
    }
}

/// A realistic parameter set for a small 4-facility, 1-year weekly run.
pub fn test_params() -> GeneratorParams {
    let salt_cavern = FacilityTypeParams {
        kind: ReservoirKind::SaltCavern,
        weight: 0.4,
        depth_m: Range { min: 800.0, max: 1_800.0 },
        pressure_min_mpa: 5.0,
        pressure_max_mpa: 20.0,
        base_temperature_c: 12.0,
        temperature_gradient_c_per_km: 28.0,
        working_gas_fraction: 0.55,
        storage_volume_m3: LogNormalBounded {
            mean: 500_000.0,
            sigma: 0.4,
            min: 150_000.0,
            max: 1_200_000.0,
        },
        porosity: None,
        permeability_md: None,
    };

    GeneratorParams {
        run: RunParams {
            n_facilities: 4,
            random_seed: 42,
            start: NaiveDate::from_ymd_opt(2025, 1, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            n_years: 1,
            frequency: Frequency::Weekly,
            initial_fill_fraction: 0.5,
            initial_purity_pct: 100.0,
            output_dir: PathBuf::from("data/generated"),
        },
        thermo: ThermoParams {
            gas_constant_r: 8.314,
            molar_mass_h2: 2.016e-3,
            compressibility_segments: vec![
                ZSegment { pressure_min_mpa: 0.0, pressure_max_mpa: 10.0, z: 1.05 },
                ZSegment { pressure_min_mpa: 10.0, pressure_max_mpa: 20.0, z: 1.12 },
                ZSegment { pressure_min_mpa: 20.0, pressure_max_mpa: 50.0, z: 1.20 },
            ],
        },
        temperature_noise: NoiseConfig { mean: 0.0, std: 1.5 },
        losses: LossParams {
            static_fraction: BoundedDistribution::Uniform { min: 0.0001, max: 0.0005 },
            dynamic_fraction: BoundedDistribution::Uniform { min: 0.0005, max: 0.002 },
        },
        purity: PurityParams {
            inlet: BandConfig { mean: 99.97, std: 0.02, min: 99.95, max: 100.0 },
            outlet_noise: NoiseConfig { mean: 0.0, std: 0.01 },
        },
        cycling: CycleParams {
            fraction_min: 0.10,
            fraction_max: 0.90,
            ramp_sigma: 0.08,
            ramp_bias: 0.03,
            mode_stay_weight: 0.6,
            mode_adjacent_weight: 0.35,
            mode_jump_probability: 0.05,
            initial_mode: None,
            cycle_length_steps: StepRange { min: 2, max: 8 },
            secondary_flow_fraction: Range { min: 0.1, max: 0.6 },
            balanced_tilt: 0.1,
            direction_cap_fraction: 0.25,
        },
        facility_types: vec![
            salt_cavern,
            porous_type(ReservoirKind::DepletedReservoir, 0.3, (1_200.0, 2_600.0), (8.0, 28.0)),
            porous_type(ReservoirKind::Aquifer, 0.15, (900.0, 2_200.0), (7.0, 24.0)),
            porous_type(ReservoirKind::PorousReservoir, 0.15, (1_000.0, 2_500.0), (8.0, 26.0)),
        ],
        validation: ValidationParams {
            pressure_margin_mpa: 0.5,
            temperature_c: Range { min: -10.0, max: 120.0 },
            purity_pct: Range { min: 95.0, max: 100.0 },
            loss_fraction: Range { min: 0.0, max: 0.01 },
            mass_balance_tolerance_fraction: 1e-3,
        },
    }
}

/// Fully deterministic variant: zero noise, zero losses, inlet purity pinned
/// to the initial purity, mode fixed to balanced with 2-step cycles.
pub fn deterministic_params() -> GeneratorParams {
    let mut params = test_params();
    params.run.n_facilities = 1;
    params.temperature_noise = NoiseConfig { mean: 0.0, std: 0.0 };
    params.losses = LossParams {
        static_fraction: BoundedDistribution::Uniform { min: 0.0, max: 0.0 },
        dynamic_fraction: BoundedDistribution::Uniform { min: 0.0, max: 0.0 },
    };
    params.purity = PurityParams {
        inlet: BandConfig { mean: 100.0, std: 0.0, min: 100.0, max: 100.0 },
        outlet_noise: NoiseConfig { mean: 0.0, std: 0.0 },
    };
    params.cycling.ramp_sigma = 0.0;
    params.cycling.ramp_bias = 0.0;
    params.cycling.mode_stay_weight = 1.0;
    params.cycling.mode_adjacent_weight = 0.0;
    params.cycling.mode_jump_probability = 0.0;
    params.cycling.initial_mode = Some(CycleMode::Balanced);
    params.cycling.cycle_length_steps = StepRange { min: 2, max: 2 };
    params.cycling.balanced_tilt = 0.0;
    params
}

/// A fixed salt-cavern facility with the given working-gas capacity.
pub fn test_facility(capacity_kg: f64) -> FacilityRecord {
    FacilityRecord {
        facility_id: "UHS_001".to_string(),
        facility_type: ReservoirKind::SaltCavern,
        country_code: "DE".to_string(),
        region: "Onshore EU".to_string(),
        latitude: 52.2,
        longitude: 9.8,
        depth_m: 1_200.0,
        storage_volume_m3: 450_000.0,
        porosity: None,
        permeability_md: None,
        pressure_min_mpa: 5.0,
        pressure_max_mpa: 20.0,
        base_temperature_c: 12.0,
        temperature_gradient_c_per_km: 28.0,
        working_gas_capacity_kg: capacity_kg,
        cushion_gas_kg: capacity_kg * 0.8,
    }
}
