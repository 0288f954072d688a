use super::*;
use crate::error::ConfigError;
use crate::image::{ImageF32, Roi};

fn render(w: usize, h: usize, background: f32, spots: &[(f64, f64, f64, f64)]) -> ImageF32 {
    let mut img = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut v = background as f64;
            for &(cx, cy, amp, sigma) in spots {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                v += amp * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            }
            img.set(x, y, v as f32);
        }
    }
    img
}

fn unfiltered() -> DetectParams {
    DetectParams {
        use_filter: false,
        ..DetectParams::default()
    }
}

#[test]
fn separated_bumps_are_both_found() {
    let img = render(40, 40, 5.0, &[(10.0, 10.0, 100.0, 1.2), (28.0, 25.0, 90.0, 1.2)]);
    let peaks = detect_peaks(&img, img.full_roi(), &unfiltered()).expect("valid params");
    assert_eq!(peaks, vec![PixelCoord::new(10, 10), PixelCoord::new(28, 25)]);
}

#[test]
fn discoidal_filter_keeps_bump_centres() {
    let img = render(40, 40, 20.0, &[(10.0, 10.0, 100.0, 1.2), (28.0, 25.0, 90.0, 1.2)]);
    let peaks = detect_peaks(&img, img.full_roi(), &DetectParams::default()).expect("valid");
    assert_eq!(peaks.len(), 2, "peaks {peaks:?}");
    assert!(peaks.contains(&PixelCoord::new(10, 10)));
    assert!(peaks.contains(&PixelCoord::new(28, 25)));
}

#[test]
fn close_bumps_collapse_to_brightest() {
    let img = render(32, 32, 5.0, &[(10.0, 10.0, 100.0, 1.2), (14.0, 10.0, 80.0, 1.2)]);
    let params = DetectParams {
        threshold_value: Some(50.0),
        ..unfiltered()
    };
    let peaks = detect_peaks(&img, img.full_roi(), &params).expect("valid params");
    assert_eq!(peaks, vec![PixelCoord::new(10, 10)]);
}

#[test]
fn detection_is_deterministic_and_leaves_input_alone() {
    let img = render(48, 48, 10.0, &[(12.0, 30.0, 70.0, 1.5), (35.0, 9.0, 60.0, 1.1)]);
    let before = img.clone();
    let detector = PeakDetector::new(DetectParams::default()).expect("valid params");
    let first = detector.detect(&img, img.full_roi());
    let second = detector.detect(&img, img.full_roi());
    assert_eq!(first, second);
    assert_eq!(img, before);
}

#[test]
fn roi_restricts_candidates() {
    let img = render(40, 40, 5.0, &[(10.0, 10.0, 100.0, 1.2), (28.0, 25.0, 90.0, 1.2)]);
    let params = DetectParams {
        threshold_value: Some(50.0),
        ..unfiltered()
    };
    let peaks = detect_peaks(&img, Roi::new(20, 15, 20, 25), &params).expect("valid params");
    assert_eq!(peaks, vec![PixelCoord::new(28, 25)]);
}

#[test]
fn flat_frame_at_threshold_terminates() {
    let mut img = ImageF32::new(12, 12);
    for v in &mut img.data {
        *v = 3.0;
    }
    let params = DetectParams {
        threshold_value: Some(3.0),
        minimum_separation: 4,
        ..unfiltered()
    };
    let peaks = detect_peaks(&img, img.full_roi(), &params).expect("valid params");
    assert!(!peaks.is_empty());
    assert_eq!(peaks[0], PixelCoord::new(0, 0));
}

#[test]
fn empty_roi_yields_no_peaks() {
    let img = render(16, 16, 5.0, &[(8.0, 8.0, 100.0, 1.2)]);
    let peaks = detect_peaks(&img, Roi::new(30, 30, 4, 4), &unfiltered()).expect("valid");
    assert!(peaks.is_empty());
}

#[test]
fn invalid_parameters_are_rejected() {
    let params = DetectParams {
        inner_radius: 3,
        outer_radius: 2,
        ..DetectParams::default()
    };
    assert_eq!(
        params.validate(),
        Err(ConfigError::InvalidFilterRadii { inner: 3, outer: 2 })
    );
    let params = DetectParams {
        minimum_separation: 0,
        ..DetectParams::default()
    };
    assert_eq!(params.validate(), Err(ConfigError::NonPositiveSeparation));
    // Radii are irrelevant without the filter.
    let params = DetectParams {
        use_filter: false,
        inner_radius: 5,
        outer_radius: 1,
        ..DetectParams::default()
    };
    assert!(params.validate().is_ok());
}
