use crate::model::TempoPoint;
use mid2bar_ports::types::{Seconds, Tick};
use std::collections::BTreeMap;

pub const DEFAULT_US_PER_QUARTER: u32 = 500_000;

/// Piecewise-linear tick <-> seconds mapping built from tempo changes.
#[derive(Clone, Debug)]
pub struct TempoMap {
    ticks_per_beat: u16,
    segments: Vec<TempoSegment>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoSegment {
    pub start_tick: Tick,
    pub start_time: Seconds,
    pub us_per_quarter: u32,
}

impl TempoMap {
    /// Points may arrive unordered; the last one at a given tick wins and
    /// zero tempos are skipped. A 120 BPM point is assumed at tick 0 unless
    /// one is declared there.
    pub fn new(ticks_per_beat: u16, points: Vec<TempoPoint>) -> Self {
        let ticks_per_beat = ticks_per_beat.max(1);

        let mut by_tick: BTreeMap<Tick, u32> = BTreeMap::new();
        by_tick.insert(0, DEFAULT_US_PER_QUARTER);
        for point in points {
            if point.us_per_quarter == 0 || point.tick < 0 {
                continue;
            }
            by_tick.insert(point.tick, point.us_per_quarter);
        }

        let mut segments: Vec<TempoSegment> = Vec::with_capacity(by_tick.len());
        for (tick, us_per_quarter) in by_tick {
            let start_time = match segments.last() {
                Some(prev) => {
                    prev.start_time
                        + ticks_to_secs(tick - prev.start_tick, prev.us_per_quarter, ticks_per_beat)
                }
                None => 0.0,
            };
            segments.push(TempoSegment {
                start_tick: tick,
                start_time,
                us_per_quarter,
            });
        }

        Self {
            ticks_per_beat,
            segments,
        }
    }

    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    pub fn ticks_to_seconds(&self, tick: Tick) -> Seconds {
        let seg = self.segment_for_tick(tick);
        seg.start_time
            + ticks_to_secs(
                tick - seg.start_tick,
                seg.us_per_quarter,
                self.ticks_per_beat,
            )
    }

    pub fn seconds_to_ticks(&self, seconds: Seconds) -> Tick {
        let seg = self.segment_for_seconds(seconds);
        let delta = seconds - seg.start_time;
        let delta_ticks =
            delta * self.ticks_per_beat as f64 * 1_000_000.0 / seg.us_per_quarter as f64;
        (seg.start_tick as f64 + delta_ticks).round() as Tick
    }

    /// Seconds covered by one tick at `tick`.
    pub fn tick_duration_at(&self, tick: Tick) -> Seconds {
        let seg = self.segment_for_tick(tick);
        ticks_to_secs(1, seg.us_per_quarter, self.ticks_per_beat)
    }

    fn segment_for_tick(&self, tick: Tick) -> TempoSegment {
        let idx = self.segments.partition_point(|seg| seg.start_tick <= tick);
        self.segments[idx.saturating_sub(1)]
    }

    fn segment_for_seconds(&self, seconds: Seconds) -> TempoSegment {
        let idx = self.segments.partition_point(|seg| seg.start_time <= seconds);
        self.segments[idx.saturating_sub(1)]
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(480, Vec::new())
    }
}

fn ticks_to_secs(ticks: Tick, us_per_quarter: u32, ticks_per_beat: u16) -> Seconds {
    ticks as f64 * us_per_quarter as f64 / 1_000_000.0 / ticks_per_beat as f64
}
