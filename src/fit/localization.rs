use super::fitter::PeakFit;
use super::gaussian::{PARAM_NAMES, SIGMA_TO_FWHM};
use crate::table::TableSink;
use serde::{Deserialize, Serialize};

/// Validated sub-pixel localization of one peak in one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    pub frame: usize,
    /// `[baseline, amplitude, x, y, sigma_x, sigma_y]`, sigmas non-negative.
    pub params: [f64; 6],
    pub errors: [f64; 6],
    pub chi_squared: f64,
    pub r_squared: f64,
}

impl Localization {
    pub fn from_fit(frame: usize, fit: &PeakFit) -> Self {
        Self {
            frame,
            params: fit.params,
            errors: fit.errors,
            chi_squared: fit.chi_squared,
            r_squared: fit.r_squared,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.params[2]
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.params[3]
    }

    pub fn baseline(&self) -> f64 {
        self.params[0]
    }

    pub fn amplitude(&self) -> f64 {
        self.params[1]
    }

    pub fn fwhm_x(&self) -> f64 {
        self.params[4] * SIGMA_TO_FWHM
    }

    pub fn fwhm_y(&self) -> f64 {
        self.params[5] * SIGMA_TO_FWHM
    }

    /// Mean of the two axis FWHMs.
    pub fn fwhm(&self) -> f64 {
        (self.fwhm_x() + self.fwhm_y()) / 2.0
    }

    /// Errors of `(fwhm_x, fwhm_y, fwhm)`.
    pub fn fwhm_errors(&self) -> (f64, f64, f64) {
        let ex = self.errors[4] * SIGMA_TO_FWHM;
        let ey = self.errors[5] * SIGMA_TO_FWHM;
        (ex, ey, (ex * ex + ey * ey).sqrt() / 2.0)
    }

    /// Append one row holding every parameter, FWHM, their errors and the
    /// frame index under `slice`.
    pub fn write_row<S: TableSink + ?Sized>(&self, sink: &mut S) {
        sink.begin_row();
        for (name, value) in PARAM_NAMES.iter().zip(self.params.iter()) {
            sink.add_value(name, *value);
        }
        sink.add_value("fwhm_x", self.fwhm_x());
        sink.add_value("fwhm_y", self.fwhm_y());
        sink.add_value("fwhm", self.fwhm());
        for (name, value) in PARAM_NAMES.iter().zip(self.errors.iter()) {
            sink.add_value(&format!("error_{name}"), *value);
        }
        let (ex, ey, e) = self.fwhm_errors();
        sink.add_value("error_fwhm_x", ex);
        sink.add_value("error_fwhm_y", ey);
        sink.add_value("error_fwhm", e);
        sink.add_value("slice", self.frame as f64);
    }
}
