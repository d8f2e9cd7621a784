use anyhow::Result;
use tracing::{info, warn};
use uhs_mrv_generator::{config::Config, generator, telemetry, validation, writer};

fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = Config::load()?;
    let params = cfg.resolve()?;

    info!(
        facilities = params.run.n_facilities,
        seed = params.run.random_seed,
        years = params.run.n_years,
        frequency = %params.run.frequency,
        "generating synthetic UHS dataset"
    );

    let dataset = generator::generate(&params)?;

    let report = validation::validate_dataset(&dataset, &params.validation);
    if report.total_violations() > 0 {
        warn!(
            violations = report.total_violations(),
            report = %serde_json::to_string(&report)?,
            "validation found out-of-range values"
        );
    } else {
        info!("validation clean");
    }

    writer::write_dataset(&dataset, &params.run.output_dir)?;

    info!(
        facilities = dataset.facilities.len(),
        timesteps = dataset.timeseries.len(),
        cycles = dataset.cycles.len(),
        "generation complete"
    );
    Ok(())
}
