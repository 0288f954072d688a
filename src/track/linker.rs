use super::params::LinkParams;
use crate::error::ConfigError;
use crate::fit::Localization;
use crate::table::TableSink;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Anything with a frame index and a 2D position.
pub trait Positioned {
    fn frame(&self) -> usize;
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

impl Positioned for Localization {
    fn frame(&self) -> usize {
        self.frame
    }
    fn x(&self) -> f64 {
        Localization::x(self)
    }
    fn y(&self) -> f64 {
        Localization::y(self)
    }
}

impl<P: Positioned + ?Sized> Positioned for &P {
    fn frame(&self) -> usize {
        (**self).frame()
    }
    fn x(&self) -> f64 {
        (**self).x()
    }
    fn y(&self) -> f64 {
        (**self).y()
    }
}

/// Bare position record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub frame: usize,
    pub x: f64,
    pub y: f64,
}

impl Spot {
    pub const fn new(frame: usize, x: f64, y: f64) -> Self {
        Self { frame, x, y }
    }
}

impl Positioned for Spot {
    fn frame(&self) -> usize {
        self.frame
    }
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
}

/// The accepted link that reached a localization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkStep {
    /// Input index of the link's source.
    pub from: usize,
    pub gap: usize,
    pub dx: f64,
    pub dy: f64,
    pub step_size: f64,
    pub displacement_sq: f64,
}

/// Linking outcome for one input localization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Position in the input slice.
    pub index: usize,
    pub frame: usize,
    pub trajectory: Option<usize>,
    /// Members of the trajectory, 1 for unlinked localizations.
    pub trajectory_length: usize,
    /// Link into this localization, `None` for trajectory starts.
    pub step: Option<LinkStep>,
}

impl LinkRecord {
    /// Add trajectory columns to the current row of `sink`. Missing values
    /// (no trajectory, no incoming link) are written as NaN.
    pub fn write_columns<S: TableSink + ?Sized>(&self, sink: &mut S) {
        sink.add_value(
            "trajectory",
            self.trajectory.map_or(f64::NAN, |id| id as f64),
        );
        sink.add_value("trajectory_length", self.trajectory_length as f64);
        let step = self.step;
        sink.add_value("dx", step.map_or(f64::NAN, |s| s.dx));
        sink.add_value("dy", step.map_or(f64::NAN, |s| s.dy));
        sink.add_value("step_size", step.map_or(f64::NAN, |s| s.step_size));
        sink.add_value(
            "displacement_sq",
            step.map_or(f64::NAN, |s| s.displacement_sq),
        );
    }
}

/// All link records, ordered by frame and then input order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Linkage {
    pub records: Vec<LinkRecord>,
    pub trajectory_count: usize,
}

/// One trajectory: input indices ordered by frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: usize,
    pub members: Vec<usize>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Borrow the members out of the slice that was linked.
    pub fn items<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        self.members.iter().filter_map(|&i| items.get(i)).collect()
    }

    /// Per-member scalar signal, e.g. the fitted amplitude over time.
    pub fn signal<T, F>(&self, items: &[T], f: F) -> Vec<f64>
    where
        F: Fn(&T) -> f64,
    {
        self.members
            .iter()
            .filter_map(|&i| items.get(i))
            .map(f)
            .collect()
    }
}

impl Linkage {
    /// Records grouped by trajectory id (ascending), members in frame order.
    pub fn trajectories(&self) -> Vec<Trajectory> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for record in &self.records {
            if let Some(id) = record.trajectory {
                groups.entry(id).or_default().push(record.index);
            }
        }
        groups
            .into_iter()
            .map(|(id, members)| Trajectory { id, members })
            .collect()
    }

    pub fn record_for(&self, index: usize) -> Option<&LinkRecord> {
        self.records.iter().find(|r| r.index == index)
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    source: usize,
    target: usize,
    gap: usize,
    dsq: f64,
}

/// Link `items` into trajectories.
pub fn link_particles<P: Positioned>(
    items: &[P],
    params: &LinkParams,
) -> Result<Linkage, ConfigError> {
    params.validate()?;
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].frame());

    let max_dsq = params.max_step * params.max_step;
    let mut assignment: Vec<Option<usize>> = vec![None; items.len()];
    let mut steps: Vec<Option<LinkStep>> = vec![None; items.len()];
    let mut source_used = vec![false; items.len()];
    let mut target_used = vec![false; items.len()];
    let mut trajectory_count = 0usize;
    let mut accepted = 0usize;

    let mut start = 0;
    while start < order.len() {
        let frame = items[order[start]].frame();
        let end = start + order[start..].partition_point(|&i| items[i].frame() == frame);

        let mut candidates = Vec::new();
        for &s in &order[start..end] {
            let src = &items[s];
            for &t in &order[end..] {
                let dst = &items[t];
                let gap = dst.frame() - frame;
                if gap > params.look_ahead {
                    break;
                }
                let dx = dst.x() - src.x();
                let dy = dst.y() - src.y();
                let dsq = dx * dx + dy * dy;
                if dsq < max_dsq {
                    candidates.push(Candidate {
                        source: s,
                        target: t,
                        gap,
                        dsq,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| match a.gap.cmp(&b.gap) {
            Ordering::Equal => a.dsq.total_cmp(&b.dsq),
            other => other,
        });

        for c in candidates {
            if source_used[c.source] || target_used[c.target] {
                continue;
            }
            source_used[c.source] = true;
            target_used[c.target] = true;
            let id = match assignment[c.source] {
                Some(id) => id,
                None => {
                    let id = trajectory_count;
                    trajectory_count += 1;
                    assignment[c.source] = Some(id);
                    id
                }
            };
            assignment[c.target] = Some(id);
            let dx = items[c.target].x() - items[c.source].x();
            let dy = items[c.target].y() - items[c.source].y();
            steps[c.target] = Some(LinkStep {
                from: c.source,
                gap: c.gap,
                dx,
                dy,
                step_size: c.dsq.sqrt(),
                displacement_sq: c.dsq,
            });
            accepted += 1;
        }
        start = end;
    }

    let mut lengths = vec![0usize; trajectory_count];
    for id in assignment.iter().flatten() {
        lengths[*id] += 1;
    }

    let records: Vec<LinkRecord> = order
        .iter()
        .filter(|&&i| params.keep_unlinked || assignment[i].is_some())
        .map(|&i| LinkRecord {
            index: i,
            frame: items[i].frame(),
            trajectory: assignment[i],
            trajectory_length: assignment[i].map_or(1, |id| lengths[id]),
            step: steps[i],
        })
        .collect();

    debug!(
        "linker: inputs={} links={} trajectories={} kept={}",
        items.len(),
        accepted,
        trajectory_count,
        records.len()
    );
    Ok(Linkage {
        records,
        trajectory_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_step: f64) -> LinkParams {
        LinkParams {
            max_step,
            ..LinkParams::default()
        }
    }

    #[test]
    fn links_within_max_step_only() {
        let spots = [Spot::new(0, 0.0, 0.0), Spot::new(1, 3.0, 0.0)];
        let linked = link_particles(&spots, &params(5.0)).expect("valid params");
        assert_eq!(linked.trajectory_count, 1);
        assert_eq!(linked.records.len(), 2);
        assert!(linked.records.iter().all(|r| r.trajectory == Some(0)));
        let step = linked.records[1].step.expect("target carries the link");
        assert_eq!(step.from, 0);
        assert!((step.step_size - 3.0).abs() < 1e-12);
        assert!((step.displacement_sq - 9.0).abs() < 1e-12);
        assert_eq!(linked.records[1].trajectory_length, 2);

        let unlinked = link_particles(&spots, &params(2.0)).expect("valid params");
        assert_eq!(unlinked.trajectory_count, 0);
        assert!(unlinked.records.is_empty());
    }

    #[test]
    fn unlinked_are_kept_on_request() {
        let spots = [Spot::new(0, 0.0, 0.0), Spot::new(1, 3.0, 0.0)];
        let p = LinkParams {
            keep_unlinked: true,
            ..params(2.0)
        };
        let linked = link_particles(&spots, &p).expect("valid params");
        assert_eq!(linked.records.len(), 2);
        assert!(linked.records.iter().all(|r| r.trajectory.is_none()));
        assert!(linked.records.iter().all(|r| r.trajectory_length == 1));
    }

    #[test]
    fn greedy_takes_shortest_link_first() {
        // A@(0,0) and B@(2,0) in frame 0; C@(1.8,0) in frame 1. C is closest
        // to B, so A stays unlinked.
        let spots = [
            Spot::new(0, 0.0, 0.0),
            Spot::new(0, 2.0, 0.0),
            Spot::new(1, 1.8, 0.0),
        ];
        let p = LinkParams {
            keep_unlinked: true,
            ..params(5.0)
        };
        let linked = link_particles(&spots, &p).expect("valid params");
        let a = linked.record_for(0).expect("A");
        let b = linked.record_for(1).expect("B");
        let c = linked.record_for(2).expect("C");
        assert_eq!(a.trajectory, None);
        assert_eq!(b.trajectory, c.trajectory);
        assert!(b.trajectory.is_some());
    }

    #[test]
    fn look_ahead_bridges_a_blink() {
        let spots = [
            Spot::new(0, 5.0, 5.0),
            Spot::new(2, 5.5, 5.0),
            Spot::new(3, 6.0, 5.0),
        ];
        let short = link_particles(&spots, &params(2.0)).expect("valid params");
        let t = short.trajectories();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].members, vec![1, 2]);

        let p = LinkParams {
            look_ahead: 2,
            ..params(2.0)
        };
        let long = link_particles(&spots, &p).expect("valid params");
        let t = long.trajectories();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].members, vec![0, 1, 2]);
        let bridged = long.record_for(1).and_then(|r| r.step).expect("bridged step");
        assert_eq!(bridged.gap, 2);
    }

    #[test]
    fn smaller_gap_wins_over_shorter_distance() {
        let spots = [
            Spot::new(0, 0.0, 0.0),
            Spot::new(1, 1.5, 0.0),
            Spot::new(2, 0.1, 0.0),
        ];
        let p = LinkParams {
            look_ahead: 2,
            keep_unlinked: true,
            ..params(5.0)
        };
        let linked = link_particles(&spots, &p).expect("valid params");
        let step = linked.record_for(1).and_then(|r| r.step).expect("gap-1 link");
        assert_eq!(step.from, 0);
        // Frame 1 then continues to frame 2.
        let last = linked.record_for(2).and_then(|r| r.step).expect("continued");
        assert_eq!(last.from, 1);
        assert_eq!(linked.trajectory_count, 1);
    }

    #[test]
    fn input_order_does_not_need_to_be_sorted() {
        let spots = [
            Spot::new(2, 2.0, 0.0),
            Spot::new(0, 0.0, 0.0),
            Spot::new(1, 1.0, 0.0),
        ];
        let linked = link_particles(&spots, &params(2.0)).expect("valid params");
        let frames: Vec<usize> = linked.records.iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![0, 1, 2]);
        let t = linked.trajectories();
        assert_eq!(t[0].members, vec![1, 2, 0]);
        assert_eq!(t[0].signal(&spots, |s| s.x), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_input_and_bad_parameters() {
        let spots: [Spot; 0] = [];
        let linked = link_particles(&spots, &LinkParams::default()).expect("valid params");
        assert!(linked.records.is_empty());
        let bad = LinkParams {
            look_ahead: 0,
            ..LinkParams::default()
        };
        assert_eq!(
            link_particles(&spots, &bad).unwrap_err(),
            ConfigError::ZeroLookAhead
        );
        assert_eq!(
            params(-1.0).validate(),
            Err(ConfigError::InvalidMaxStep(-1.0))
        );
    }
}
