use peak_tracker::config::localize;
use peak_tracker::fit::DEFAULT_SENSOR_BITS;
use peak_tracker::image::io::{load_frame, save_grayscale_f32, write_json_file, LoadedFrame};
use peak_tracker::image::ImageF32;
use peak_tracker::localize::{LocalizationReport, Localizer};
use peak_tracker::table::ResultsTable;
use peak_tracker::track::msd::{self, DiffusionFit, MsdPoint};
use peak_tracker::track::step_sizes::{self, StepSizeFit, StepSizeHistogram};
use peak_tracker::track::{link_particles, Linkage};
use serde::Serialize;
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
    let config = localize::load_config(Path::new(&config_path))?;

    let loaded: Vec<LoadedFrame> = config
        .frames
        .iter()
        .map(|p| load_frame(p))
        .collect::<Result<_, _>>()?;
    let bit_depth = loaded.iter().map(|f| f.bit_depth).max().unwrap_or(DEFAULT_SENSOR_BITS);
    let frames: Vec<ImageF32> = loaded.into_iter().map(|f| f.image).collect();
    let first = frames.first().ok_or("Config lists no frames")?;
    let roi = config.roi.unwrap_or_else(|| first.full_roi());

    let mut params = config.localizer.clone();
    params.fit.sensor_bits.get_or_insert(bit_depth);
    if let Some(level) = params.fit.saturation_level() {
        println!("Excluding samples >= {level} from fits");
    }
    let localizer = Localizer::new(params).map_err(|e| e.to_string())?;
    if let Some(path) = &config.output.filtered_image {
        let filtered = localizer.detector().prepare(first, roi);
        save_grayscale_f32(&filtered, path)?;
        println!("Saved preprocessed first frame to {}", path.display());
    }

    let localization = localizer.process_stack(&frames, roi);
    println!("{}", localization.status_line());

    let linkage = match &config.link {
        Some(params) => Some(
            link_particles(&localization.localizations, params).map_err(|e| e.to_string())?,
        ),
        None => None,
    };
    if let Some(linkage) = &linkage {
        println!("Linked {} trajectories", linkage.trajectory_count);
    }

    let (msd_curve, diffusion) = match (&linkage, &config.msd) {
        (Some(linkage), Some(params)) => {
            params.validate().map_err(|e| e.to_string())?;
            let curve = msd::mean_square_displacement(&localization.localizations, linkage, params);
            let fits = msd::fit_diffusion(&curve, params);
            for fit in &fits {
                println!(
                    "trajectory {:?}: D = {:.6} ± {:.6} (R² {:.4})",
                    fit.trajectory, fit.d, fit.d_error, fit.r_squared
                );
            }
            (curve, fits)
        }
        (None, Some(_)) => return Err("MSD analysis requires `link` parameters".to_string()),
        _ => (Vec::new(), Vec::new()),
    };

    let step_report = match (&linkage, &config.step_sizes) {
        (Some(linkage), Some(params)) => {
            params.validate().map_err(|e| e.to_string())?;
            let sizes = step_sizes::step_sizes(linkage, params);
            let histogram = step_sizes::step_size_histogram(&sizes, params);
            let fit = histogram
                .as_ref()
                .and_then(|h| step_sizes::fit_step_sizes(h, params));
            match &fit {
                Some(fit) => println!(
                    "step sizes: D = {:.6} ± {:.6} over {} steps",
                    fit.d,
                    fit.d_error,
                    sizes.len()
                ),
                None => println!("step sizes: no fit over {} steps", sizes.len()),
            }
            histogram.map(|histogram| StepSizeReport { histogram, fit })
        }
        (None, Some(_)) => {
            return Err("Step size analysis requires `link` parameters".to_string())
        }
        _ => None,
    };

    if let Some(path) = &config.output.table_json {
        let table = results_table(&localization, linkage.as_ref());
        write_json_file(path, &table)?;
        println!("Saved {} result rows to {}", table.len(), path.display());
    }

    if let Some(path) = &config.output.report_json {
        let report = LocalizeToolReport {
            localization: &localization,
            linkage: linkage.as_ref(),
            msd: msd_curve,
            diffusion,
            step_sizes: step_report,
        };
        write_json_file(path, &report)?;
        println!("Saved report to {}", path.display());
    }

    Ok(())
}

fn results_table(report: &LocalizationReport, linkage: Option<&Linkage>) -> ResultsTable {
    let mut table = ResultsTable::new();
    match linkage {
        Some(linkage) => {
            for record in &linkage.records {
                report.localizations[record.index].write_row(&mut table);
                record.write_columns(&mut table);
            }
        }
        None => report.write_rows(&mut table),
    }
    table
}

fn usage() -> String {
    "Usage: localize <config.json>".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocalizeToolReport<'a> {
    localization: &'a LocalizationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkage: Option<&'a Linkage>,
    msd: Vec<MsdPoint>,
    diffusion: Vec<DiffusionFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_sizes: Option<StepSizeReport>,
}

#[derive(Serialize)]
struct StepSizeReport {
    histogram: StepSizeHistogram,
    fit: Option<StepSizeFit>,
}
