//! # Facility Metadata Sampling
//!
//! Draws the static per-facility attributes (reservoir kind, depth, volume,
//! pressure envelope, derived working-gas capacity) from the configured
//! per-type distributions. One record per facility, immutable once sampled.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::{FacilityTypeParams, GeneratorParams};
use crate::error::{GeneratorError, Result};
use crate::physics;

/// Reservoir kind of a storage facility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservoirKind {
    SaltCavern,
    DepletedReservoir,
    Aquifer,
    PorousReservoir,
}

impl ReservoirKind {
    /// Porous kinds carry porosity/permeability attributes; salt caverns are
    /// solution-mined voids and do not.
    pub fn is_porous(&self) -> bool {
        !matches!(self, ReservoirKind::SaltCavern)
    }
}

/// Static facility metadata, the anchor record for the timeseries and cycle
/// summary tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub facility_id: String,
    pub facility_type: ReservoirKind,
    pub country_code: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_m: f64,
    pub storage_volume_m3: f64,
    pub porosity: Option<f64>,
    pub permeability_md: Option<f64>,
    pub pressure_min_mpa: f64,
    pub pressure_max_mpa: f64,
    pub base_temperature_c: f64,
    pub temperature_gradient_c_per_km: f64,
    pub working_gas_capacity_kg: f64,
    pub cushion_gas_kg: f64,
}

// Placeholder geography, refined later if the dataset grows a location model
const COUNTRIES: [&str; 5] = ["US", "DE", "NL", "FR", "NO"];
const REGIONS: [&str; 5] = ["Gulf Coast", "North Sea", "Onshore EU", "Offshore EU", "Nordic"];

/// Sample the full facility set. Deterministic for a given generator state:
/// the same seed and configuration always produce the same facilities.
pub fn sample_facilities<R: Rng>(
    params: &GeneratorParams,
    rng: &mut R,
) -> Result<Vec<FacilityRecord>> {
    let weights: Vec<f64> = params.facility_types.iter().map(|t| t.weight).collect();
    let type_index = WeightedIndex::new(&weights)
        .map_err(|e| GeneratorError::config(format!("facility_types weights: {e}")))?;

    let mut facilities = Vec::with_capacity(params.run.n_facilities);
    for i in 0..params.run.n_facilities {
        let type_params = &params.facility_types[type_index.sample(rng)];
        let facility_id = format!("UHS_{:03}", i + 1);
        facilities.push(sample_one(&facility_id, type_params, params, rng)?);
    }
    Ok(facilities)
}

fn sample_one<R: Rng>(
    facility_id: &str,
    type_params: &FacilityTypeParams,
    params: &GeneratorParams,
    rng: &mut R,
) -> Result<FacilityRecord> {
    let country_code = COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string();
    let region = REGIONS[rng.gen_range(0..REGIONS.len())].to_string();
    let latitude = rng.gen_range(-60.0..=60.0);
    let longitude = rng.gen_range(-180.0..=180.0);

    let depth_m = type_params.depth_m.sample(rng);
    let storage_volume_m3 = type_params.storage_volume_m3.sample(rng);

    let porosity = type_params.porosity.map(|range| range.sample(rng));
    let permeability_md = type_params.permeability_md.map(|dist| dist.sample(rng));

    // Representative reservoir temperature at depth, then total gas mass at
    // maximum envelope pressure; the working-gas share of that is the
    // facility's cycling capacity, the rest stays as cushion gas.
    let temperature_c = physics::temperature_at_depth(
        depth_m,
        type_params.base_temperature_c,
        type_params.temperature_gradient_c_per_km,
        &params.temperature_noise,
        rng,
    );
    let total_mass_kg = physics::mass_from_pvt(
        type_params.pressure_max_mpa,
        temperature_c,
        storage_volume_m3,
        &params.thermo,
    );
    let working_gas_capacity_kg = total_mass_kg * type_params.working_gas_fraction;
    let cushion_gas_kg = (total_mass_kg - working_gas_capacity_kg).max(0.0);

    if working_gas_capacity_kg <= 0.0 {
        return Err(GeneratorError::config(format!(
            "{facility_id}: derived working gas capacity is not positive \
             (volume {storage_volume_m3} m3 at {} MPa)",
            type_params.pressure_max_mpa
        )));
    }

    Ok(FacilityRecord {
        facility_id: facility_id.to_string(),
        facility_type: type_params.kind,
        country_code,
        region,
        latitude,
        longitude,
        depth_m,
        storage_volume_m3,
        porosity,
        permeability_md,
        pressure_min_mpa: type_params.pressure_min_mpa,
        pressure_max_mpa: type_params.pressure_max_mpa,
        base_temperature_c: type_params.base_temperature_c,
        temperature_gradient_c_per_km: type_params.temperature_gradient_c_per_km,
        working_gas_capacity_kg,
        cushion_gas_kg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_params;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_reservoir_kind_tokens() {
        use std::str::FromStr;
        assert_eq!(ReservoirKind::SaltCavern.to_string(), "salt_cavern");
        assert_eq!(
            ReservoirKind::from_str("porous_reservoir").unwrap(),
            ReservoirKind::PorousReservoir
        );
        assert!(ReservoirKind::from_str("moon_base").is_err());
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let params = test_params();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = sample_facilities(&params, &mut rng_a).unwrap();
        let b = sample_facilities(&params, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_facility_invariants() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(7);
        let facilities = sample_facilities(&params, &mut rng).unwrap();
        assert_eq!(facilities.len(), params.run.n_facilities);
        for f in &facilities {
            assert!(f.pressure_min_mpa < f.pressure_max_mpa, "{}", f.facility_id);
            assert!(f.working_gas_capacity_kg > 0.0);
            assert!(f.cushion_gas_kg >= 0.0);
            match f.facility_type {
                ReservoirKind::SaltCavern => {
                    assert!(f.porosity.is_none());
                    assert!(f.permeability_md.is_none());
                }
                _ => {
                    assert!(f.porosity.is_some());
                    assert!(f.permeability_md.is_some());
                }
            }
        }
    }

    #[test]
    fn test_facility_ids_are_sequential() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(1);
        let facilities = sample_facilities(&params, &mut rng).unwrap();
        assert_eq!(facilities[0].facility_id, "UHS_001");
        assert_eq!(facilities[1].facility_id, "UHS_002");
    }
}
