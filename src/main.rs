use peak_tracker::image::{ImageF32, Roi};
use peak_tracker::{fit_changepoints, link_particles, LinkParams, Localizer, LocalizerParams};
use peak_tracker::StepTarget;

fn main() {
    env_logger::init();
    // Synthetic demo: a single spot drifting right and bleaching in two steps.
    let (w, h) = (64usize, 64usize);
    let frames: Vec<ImageF32> = (0..30)
        .map(|i| {
            let amplitude = match i {
                0..=9 => 300.0,
                10..=19 => 200.0,
                _ => 100.0,
            };
            spot_frame(w, h, 20.0 + 0.5 * i as f64, 32.0, amplitude)
        })
        .collect();

    let localizer = match Localizer::new(LocalizerParams::default()) {
        Ok(l) => l,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let report = localizer.process_stack(&frames, Roi::new(0, 0, w, h));
    println!("{} latency_ms={:.3}", report.status_line(), report.timing.total_ms);

    let linkage = match link_particles(&report.localizations, &LinkParams::default()) {
        Ok(l) => l,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    for trajectory in linkage.trajectories() {
        let signal = trajectory.signal(&report.localizations, |l| l.amplitude());
        match fit_changepoints(&signal, 10.0, StepTarget::Auto) {
            Ok(fit) => println!(
                "trajectory {} ({} frames): steps at {}",
                trajectory.id,
                trajectory.len(),
                fit
            ),
            Err(err) => eprintln!("Error: {err}"),
        }
    }
}

fn spot_frame(w: usize, h: usize, cx: f64, cy: f64, amplitude: f64) -> ImageF32 {
    let mut img = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let ripple = ((x * 31 + y * 17) % 7) as f64 - 3.0;
            let v = 50.0 + ripple + amplitude * (-(dx * dx + dy * dy) / (2.0 * 1.3 * 1.3)).exp();
            img.set(x, y, v as f32);
        }
    }
    img
}
