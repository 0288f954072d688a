use peak_tracker::config::step_fit::{self, SignalFile};
use peak_tracker::image::io::{read_json_file, write_json_file};
use peak_tracker::steps::fit_changepoints;
use peak_tracker::table::ResultsTable;
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = step_fit::load_config(Path::new(&config_path))?;

    let input: SignalFile = read_json_file(&config.input)?;
    let (x, y) = input.columns(config.column.as_deref(), config.x_column.as_deref())?;
    config.steps.validate().map_err(|e| e.to_string())?;

    let fit = fit_changepoints(&y, config.steps.noise_sigma, config.steps.target)
        .map_err(|e| e.to_string())?;
    println!(
        "{} segments, boundaries: {} (chi2 {:.4}, counter chi2 {:.4})",
        fit.steps.len(),
        fit,
        fit.chi_squared,
        fit.counter_chi_squared
    );

    let mut table = ResultsTable::new();
    fit.write_rows(&mut table, x.as_deref());
    write_json_file(&config.output, &table)?;
    println!("Saved step table to {}", config.output.display());
    Ok(())
}

fn usage() -> String {
    "Usage: step_fit <config.json>".to_string()
}
