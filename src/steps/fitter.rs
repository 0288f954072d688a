use super::params::{StepParams, StepTarget};
use crate::error::ConfigError;
use crate::table::TableSink;
use log::debug;
use serde::Serialize;
use std::fmt;

/// Contiguous segment `[from, to)` with its mean and χ².
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Step {
    pub from: usize,
    pub to: usize,
    pub mean: f64,
    pub chi_squared: f64,
}

impl Step {
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.to == self.from
    }
}

/// Incremental step fitter over one signal.
///
/// Segment statistics come from prefix sums of the mean-centred signal, so
/// evaluating any candidate segment is O(1).
#[derive(Clone, Debug)]
pub struct StepFitter {
    offset: f64,
    sums: Vec<f64>,
    squares: Vec<f64>,
    inv_var: f64,
    steps: Vec<Step>,
    counter_steps: Vec<Step>,
    chi_squared: f64,
    counter_chi_squared: f64,
}

impl StepFitter {
    pub fn new(signal: &[f64], noise_sigma: f64) -> Result<Self, ConfigError> {
        StepParams {
            noise_sigma,
            target: StepTarget::Auto,
        }
        .validate()?;
        let n = signal.len();
        let offset = if n == 0 {
            0.0
        } else {
            signal.iter().sum::<f64>() / n as f64
        };
        let mut sums = Vec::with_capacity(n + 1);
        let mut squares = Vec::with_capacity(n + 1);
        sums.push(0.0);
        squares.push(0.0);
        let (mut s, mut q) = (0.0, 0.0);
        for &v in signal {
            let c = v - offset;
            s += c;
            q += c * c;
            sums.push(s);
            squares.push(q);
        }
        let mut fitter = Self {
            offset,
            sums,
            squares,
            inv_var: 1.0 / (noise_sigma * noise_sigma),
            steps: Vec::new(),
            counter_steps: Vec::new(),
            chi_squared: 0.0,
            counter_chi_squared: 0.0,
        };
        fitter.clear();
        Ok(fitter)
    }

    /// Number of samples in the signal.
    pub fn len(&self) -> usize {
        self.sums.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset to a single segment covering the whole signal.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.chi_squared = 0.0;
        if !self.is_empty() {
            let whole = self.segment(0, self.len());
            self.chi_squared = whole.chi_squared;
            self.steps.push(whole);
        }
        self.update_counter_steps();
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn counter_steps(&self) -> &[Step] {
        &self.counter_steps
    }

    pub fn chi_squared(&self) -> f64 {
        self.chi_squared
    }

    pub fn counter_chi_squared(&self) -> f64 {
        self.counter_chi_squared
    }

    fn segment(&self, from: usize, to: usize) -> Step {
        let n = (to - from) as f64;
        let s = self.sums[to] - self.sums[from];
        let q = self.squares[to] - self.squares[from];
        let chi = (q - s * s / n).max(0.0) * self.inv_var;
        Step {
            from,
            to,
            mean: self.offset + s / n,
            chi_squared: chi,
        }
    }

    /// Split of `step` with the lowest combined χ²; the earliest index wins
    /// ties. `None` for segments shorter than two samples.
    fn best_split(&self, step: &Step) -> Option<(Step, Step)> {
        let mut best: Option<(Step, Step, f64)> = None;
        for i in (step.from + 1)..step.to {
            let left = self.segment(step.from, i);
            let right = self.segment(i, step.to);
            let chi = left.chi_squared + right.chi_squared;
            if best.map_or(true, |(_, _, b)| chi < b) {
                best = Some((left, right, chi));
            }
        }
        best.map(|(l, r, _)| (l, r))
    }

    /// Split the segment that lowers the global χ² the most.
    ///
    /// Returns `false`, leaving the segmentation unchanged, when no split
    /// improves χ².
    pub fn add_step(&mut self) -> bool {
        let mut best_chi = self.chi_squared;
        let mut best: Option<(usize, Step, Step)> = None;
        for (index, step) in self.steps.iter().enumerate() {
            let rest = self.chi_squared - step.chi_squared;
            if rest > best_chi || step.len() < 2 {
                continue;
            }
            let Some((left, right)) = self.best_split(step) else {
                continue;
            };
            let split_chi = left.chi_squared + right.chi_squared;
            if split_chi >= step.chi_squared {
                continue;
            }
            let chi = rest + split_chi;
            if chi < best_chi {
                best_chi = chi;
                best = Some((index, left, right));
            }
        }
        let Some((index, left, right)) = best else {
            return false;
        };
        self.steps.remove(index);
        self.steps.insert(index, right);
        self.steps.insert(index, left);
        self.chi_squared = best_chi;
        self.update_counter_steps();
        true
    }

    fn update_counter_steps(&mut self) {
        self.counter_steps.clear();
        self.counter_chi_squared = 0.0;
        if self.is_empty() {
            return;
        }
        let mut last = 0;
        let mut counter = Vec::with_capacity(self.steps.len() + 1);
        for step in &self.steps {
            if step.len() < 2 {
                continue;
            }
            if let Some((left, _)) = self.best_split(step) {
                counter.push(self.segment(last, left.to));
                last = left.to;
            }
        }
        counter.push(self.segment(last, self.len()));
        self.counter_chi_squared = counter.iter().map(|s| s.chi_squared).sum();
        self.counter_steps = counter;
    }

    /// Add splits until `target` is met or nothing improves any more.
    /// Returns the number of splits performed.
    pub fn fit(&mut self, target: StepTarget) -> usize {
        let mut splits = 0;
        match target {
            StepTarget::Segments(n) => {
                while self.steps.len() < n && self.add_step() {
                    splits += 1;
                }
            }
            StepTarget::Auto => {
                let mut ratio = f64::MAX;
                loop {
                    if !self.add_step() {
                        break;
                    }
                    splits += 1;
                    let previous = ratio;
                    ratio = self.chi_squared / self.counter_chi_squared;
                    if ratio.is_nan() || ratio >= previous {
                        break;
                    }
                }
            }
        }
        debug!(
            "step fit: samples={} target={:?} segments={} chi2={:.4} counter_chi2={:.4}",
            self.len(),
            target,
            self.steps.len(),
            self.chi_squared,
            self.counter_chi_squared
        );
        splits
    }

    /// Segment boundaries and means as a plottable polyline: two points per
    /// segment, `(from, mean)` and `(to, mean)`.
    pub fn steps_xy(&self) -> (Vec<f64>, Vec<f64>) {
        polyline(&self.steps)
    }

    pub fn counter_steps_xy(&self) -> (Vec<f64>, Vec<f64>) {
        polyline(&self.counter_steps)
    }

    pub fn result(&self) -> StepFit {
        StepFit {
            steps: self.steps.clone(),
            counter_steps: self.counter_steps.clone(),
            chi_squared: self.chi_squared,
            counter_chi_squared: self.counter_chi_squared,
        }
    }
}

fn polyline(steps: &[Step]) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::with_capacity(steps.len() * 2);
    let mut ys = Vec::with_capacity(steps.len() * 2);
    for s in steps {
        xs.extend([s.from as f64, s.to as f64]);
        ys.extend([s.mean, s.mean]);
    }
    (xs, ys)
}

fn write_boundaries(steps: &[Step], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(first) = steps.first() else {
        return Ok(());
    };
    write!(f, "{}", first.from)?;
    for s in steps {
        write!(f, ", {}", s.to)?;
    }
    Ok(())
}

impl fmt::Display for StepFitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_boundaries(&self.steps, f)
    }
}

/// Final segmentation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepFit {
    pub steps: Vec<Step>,
    pub counter_steps: Vec<Step>,
    pub chi_squared: f64,
    pub counter_chi_squared: f64,
}

impl StepFit {
    /// Boundary indices `[0, b1, ..., n]`.
    pub fn boundaries(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.steps.first().map(|s| s.from).into_iter().collect();
        out.extend(self.steps.iter().map(|s| s.to));
        out
    }

    /// One row per segment with `from`, `to` and `signal`, plus the matching
    /// counter segment when one exists. Indices are mapped through `x` when
    /// given (clamped to its last entry).
    pub fn write_rows<S: TableSink + ?Sized>(&self, sink: &mut S, x: Option<&[f64]>) {
        let map = |i: usize| match x {
            Some(x) if !x.is_empty() => x[i.min(x.len() - 1)],
            _ => i as f64,
        };
        for (i, step) in self.steps.iter().enumerate() {
            sink.begin_row();
            sink.add_value("from", map(step.from));
            sink.add_value("to", map(step.to));
            sink.add_value("signal", step.mean);
            if let Some(counter) = self.counter_steps.get(i) {
                sink.add_value("counter_from", map(counter.from));
                sink.add_value("counter_to", map(counter.to));
                sink.add_value("counter_signal", counter.mean);
            }
        }
    }
}

impl fmt::Display for StepFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_boundaries(&self.steps, f)
    }
}

/// Segment `signal` in one call.
pub fn fit_changepoints(
    signal: &[f64],
    noise_sigma: f64,
    target: StepTarget,
) -> Result<StepFit, ConfigError> {
    let mut fitter = StepFitter::new(signal, noise_sigma)?;
    fitter.fit(target);
    Ok(fitter.result())
}
