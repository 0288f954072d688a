//! Sub-pixel refinement of detected peaks with a 2D Gaussian model.
//!
//! Each candidate is fitted over a square window around its integer
//! position, on the raw (unfiltered) frame. A fit is kept only when all six
//! parameters and their standard errors are finite and each error stays
//! below the configured bound.
mod fitter;
mod gaussian;
mod localization;
mod params;

pub use fitter::{fit_peak, GaussianPeakFitter, PeakFit, Seed};
pub use gaussian::{Gaussian2D, PARAM_NAMES, SIGMA_TO_FWHM};
pub use localization::Localization;
pub use params::{FitParams, Saturation, DEFAULT_SENSOR_BITS};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageF32, Roi};
    use crate::lmfit::Model;
    use crate::peaks::PixelCoord;
    use crate::table::ResultsTable;

    fn synthetic(truth: &[f64; 6], w: usize, h: usize) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, Gaussian2D.value(&[x as f64, y as f64], truth) as f32);
            }
        }
        img
    }

    #[test]
    fn recovers_synthetic_gaussian() {
        let truth = [5.0, 100.0, 10.0, 10.0, 1.2, 1.2];
        let img = synthetic(&truth, 21, 21);
        let window = Roi::square_around(10, 10, 4, img.w, img.h);
        let fit = fit_peak(&img, window, &Seed::default(), None);
        for (i, (got, want)) in fit.params.iter().zip(truth.iter()).enumerate() {
            assert!((got - want).abs() < 1e-4, "param {i}: got {got}, want {want}");
        }
        assert!(fit.r_squared >= 0.999, "r2 {}", fit.r_squared);
        assert_eq!(fit.samples, 81);
    }

    #[test]
    fn off_centre_peak_converges_from_seed() {
        let truth = [12.0, 250.0, 15.4, 8.7, 1.5, 1.1];
        let img = synthetic(&truth, 30, 20);
        let fitter = GaussianPeakFitter::new(FitParams::default()).expect("valid params");
        let loc = fitter
            .fit_candidate(&img, 3, PixelCoord::new(15, 9))
            .expect("fit should validate");
        assert_eq!(loc.frame, 3);
        assert!((loc.x() - 15.4).abs() < 1e-3);
        assert!((loc.y() - 8.7).abs() < 1e-3);
        assert!((loc.params[4] - 1.5).abs() < 1e-3);
        assert!((loc.params[5] - 1.1).abs() < 1e-3);
    }

    #[test]
    fn saturated_samples_are_excluded() {
        let truth = [5.0, 100.0, 10.0, 10.0, 1.2, 1.2];
        let mut img = synthetic(&truth, 21, 21);
        img.set(10, 10, 1000.0);
        let window = Roi::square_around(10, 10, 4, img.w, img.h);
        let fit = fit_peak(&img, window, &Seed::default(), Some(1000.0));
        assert_eq!(fit.samples, 80);
        assert!((fit.params[1] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn clipped_16_bit_spot_fits_without_its_flat_top() {
        let truth = [100.0, 90000.0, 10.0, 10.0, 1.2, 1.2];
        let mut img = synthetic(&truth, 21, 21);
        let mut clipped = 0;
        for v in &mut img.data {
            if *v >= 65535.0 {
                *v = 65535.0;
                clipped += 1;
            }
        }
        assert_eq!(clipped, 1);

        let fitter = GaussianPeakFitter::new(FitParams::default()).expect("valid params");
        let peak = PixelCoord::new(10, 10);
        let fit = fitter.fit_window(&img, fitter.window(&img, peak), &Seed::at(10.0, 10.0));
        assert_eq!(fit.samples, 80);
        assert!((fit.params[1] - 90000.0).abs() < 1.0, "amplitude {}", fit.params[1]);
        assert!((fit.params[4] - 1.2).abs() < 1e-3, "sigma_x {}", fit.params[4]);
        assert!((fit.params[5] - 1.2).abs() < 1e-3, "sigma_y {}", fit.params[5]);

        let unclipped = GaussianPeakFitter::new(FitParams {
            saturation: Saturation::Off,
            ..FitParams::default()
        })
        .expect("valid params");
        let fit = unclipped.fit_window(&img, unclipped.window(&img, peak), &Seed::at(10.0, 10.0));
        assert_eq!(fit.samples, 81);
    }

    #[test]
    fn negative_sigma_seeds_report_positive_widths() {
        let truth = [5.0, 100.0, 10.0, 10.0, 1.2, 1.4];
        let img = synthetic(&truth, 21, 21);
        let window = Roi::square_around(10, 10, 4, img.w, img.h);
        let seed = Seed::at(10.0, 10.0).with(4, -1.0).with(5, -1.0);
        let fit = fit_peak(&img, window, &seed, None);
        assert!((fit.params[4] - 1.2).abs() < 1e-4, "sigma_x {}", fit.params[4]);
        assert!((fit.params[5] - 1.4).abs() < 1e-4, "sigma_y {}", fit.params[5]);
        let loc = Localization::from_fit(0, &fit);
        assert_eq!(loc.params, fit.params);
        assert!(loc.fwhm() > 0.0);
    }

    #[test]
    fn flat_window_is_rejected() {
        let mut img = ImageF32::new(16, 16);
        for v in &mut img.data {
            *v = 9.0;
        }
        let fitter = GaussianPeakFitter::new(FitParams::default()).expect("valid params");
        assert!(fitter.fit_candidate(&img, 0, PixelCoord::new(8, 8)).is_none());
    }

    #[test]
    fn tight_error_bound_rejects_noisy_fit() {
        let truth = [5.0, 100.0, 10.0, 10.0, 1.2, 1.2];
        let mut img = synthetic(&truth, 21, 21);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v += if i % 3 == 0 { 4.0 } else { -2.0 };
        }
        let window = Roi::square_around(10, 10, 4, img.w, img.h);
        let fit = fit_peak(&img, window, &Seed::at(10.0, 10.0), None);
        assert!(fit.is_valid(&FitParams::default().max_errors));
        assert!(!fit.is_valid(&[5000.0, 5000.0, 1e-9, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn row_export_uses_result_column_names() {
        let loc = Localization {
            frame: 7,
            params: [5.0, 100.0, 10.0, 11.0, 1.0, 2.0],
            errors: [0.1, 0.2, 0.01, 0.02, 0.03, 0.04],
            chi_squared: 1.0,
            r_squared: 0.99,
        };
        let mut table = ResultsTable::new();
        loc.write_row(&mut table);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "height"), Some(100.0));
        assert_eq!(table.value(0, "slice"), Some(7.0));
        let fwhm = table.value(0, "fwhm").expect("fwhm column");
        assert!((fwhm - 1.5 * SIGMA_TO_FWHM).abs() < 1e-12);
        let err = table.value(0, "error_fwhm").expect("error column");
        let ex = 0.03 * SIGMA_TO_FWHM;
        let ey = 0.04 * SIGMA_TO_FWHM;
        assert!((err - (ex * ex + ey * ey).sqrt() / 2.0).abs() < 1e-12);
        assert_eq!(table.columns().len(), 19);
    }

    #[test]
    fn zero_fit_radius_is_rejected() {
        let params = FitParams {
            fit_radius: 0,
            ..FitParams::default()
        };
        assert!(GaussianPeakFitter::new(params).is_err());
    }
}
