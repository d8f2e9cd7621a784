//! # Post-hoc Range Validation
//!
//! Checks the generated tables against the configured physical bands and the
//! mass-balance tolerance. Purely a reporting layer over the simulator's
//! output; the simulation itself enforces its invariants by construction.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::config::ValidationParams;
use crate::generator::Dataset;
use crate::metadata::FacilityRecord;
use crate::simulator::TimestepRecord;

/// True if pressure sits inside `[p_min - margin, p_max + margin]`.
pub fn check_pressure_within_bounds(
    pressure_mpa: f64,
    p_min_mpa: f64,
    p_max_mpa: f64,
    margin_mpa: f64,
) -> bool {
    pressure_mpa >= p_min_mpa - margin_mpa && pressure_mpa <= p_max_mpa + margin_mpa
}

pub fn check_temperature_range(temperature_c: f64, params: &ValidationParams) -> bool {
    params.temperature_c.contains(temperature_c)
}

pub fn check_purity_range(purity_pct: f64, params: &ValidationParams) -> bool {
    params.purity_pct.contains(purity_pct)
}

pub fn check_loss_fraction_range(loss_fraction: f64, params: &ValidationParams) -> bool {
    params.loss_fraction.contains(loss_fraction)
}

/// True if the recorded residual is within the configured tolerance.
pub fn is_mass_balance_ok(residual: f64, params: &ValidationParams) -> bool {
    residual.abs() <= params.mass_balance_tolerance_fraction
}

/// Violation counts for one facility's timeseries.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityValidation {
    pub facility_id: String,
    pub timesteps: usize,
    pub pressure_violations: usize,
    pub temperature_violations: usize,
    pub purity_violations: usize,
    pub mass_balance_violations: usize,
}

impl FacilityValidation {
    pub fn violations(&self) -> usize {
        self.pressure_violations
            + self.temperature_violations
            + self.purity_violations
            + self.mass_balance_violations
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub facilities: Vec<FacilityValidation>,
}

impl ValidationReport {
    pub fn total_violations(&self) -> usize {
        self.facilities.iter().map(|f| f.violations()).sum()
    }
}

/// Validate the whole dataset, one summary entry per facility.
pub fn validate_dataset(dataset: &Dataset, params: &ValidationParams) -> ValidationReport {
    let by_facility: HashMap<&str, Vec<&TimestepRecord>> = dataset
        .timeseries
        .iter()
        .map(|r| (r.facility_id.as_str(), r))
        .into_group_map();

    let facilities = dataset
        .facilities
        .iter()
        .map(|facility| {
            let rows = by_facility
                .get(facility.facility_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            validate_facility(facility, rows, params)
        })
        .collect();

    ValidationReport { facilities }
}

fn validate_facility(
    facility: &FacilityRecord,
    rows: &[&TimestepRecord],
    params: &ValidationParams,
) -> FacilityValidation {
    let mut out = FacilityValidation {
        facility_id: facility.facility_id.clone(),
        timesteps: rows.len(),
        pressure_violations: 0,
        temperature_violations: 0,
        purity_violations: 0,
        mass_balance_violations: 0,
    };
    for row in rows {
        if !check_pressure_within_bounds(
            row.pressure_mpa,
            facility.pressure_min_mpa,
            facility.pressure_max_mpa,
            params.pressure_margin_mpa,
        ) {
            out.pressure_violations += 1;
        }
        if !check_temperature_range(row.temperature_c, params) {
            out.temperature_violations += 1;
        }
        let purities = [
            row.inlet_purity_pct,
            row.outlet_purity_pct,
            row.working_purity_pct,
        ];
        if purities.iter().any(|&p| !check_purity_range(p, params)) {
            out.purity_violations += 1;
        }
        if !is_mass_balance_ok(row.mass_balance_residual, params) {
            out.mass_balance_violations += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::testing::test_params;

    #[test]
    fn test_pressure_bounds_with_margin() {
        assert!(check_pressure_within_bounds(4.8, 5.0, 20.0, 0.5));
        assert!(check_pressure_within_bounds(20.4, 5.0, 20.0, 0.5));
        assert!(!check_pressure_within_bounds(21.0, 5.0, 20.0, 0.5));
        assert!(!check_pressure_within_bounds(4.0, 5.0, 20.0, 0.5));
    }

    #[test]
    fn test_loss_fraction_band() {
        let params = test_params().validation;
        assert!(check_loss_fraction_range(0.001, &params));
        assert!(!check_loss_fraction_range(0.5, &params));
    }

    #[test]
    fn test_generated_dataset_validates_clean_on_physical_bands() {
        let params = test_params();
        let dataset = generate(&params).unwrap();
        let report = validate_dataset(&dataset, &params.validation);
        assert_eq!(report.facilities.len(), dataset.facilities.len());
        for facility in &report.facilities {
            assert!(facility.timesteps > 0);
            // Pressure is envelope-clamped by construction and the
            // temperature band is generous, so these never fire.
            assert_eq!(facility.pressure_violations, 0);
            assert_eq!(facility.temperature_violations, 0);
        }
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ValidationReport {
            facilities: vec![FacilityValidation {
                facility_id: "UHS_001".into(),
                timesteps: 52,
                pressure_violations: 0,
                temperature_violations: 0,
                purity_violations: 1,
                mass_balance_violations: 2,
            }],
        };
        assert_eq!(report.total_violations(), 3);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("UHS_001"));
    }
}
