use crate::simulator::{Compartment, Trajectory};
use std::fmt;

/// CD4 count below which the AIDS phase is considered to have started (mm⁻³)
pub const AIDS_THRESHOLD: f64 = 200.0;

/// Clinical stage of the infection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Acute,
    Chronic,
    Aids,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Acute => "Acute Infection",
            Phase::Chronic => "Chronic Infection",
            Phase::Aids => "AIDS Phase",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A time range annotated with a [Phase]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSpan {
    pub phase: Phase,
    pub start: f64,
    pub end: f64,
}

impl PhaseSpan {
    pub fn new(phase: Phase, start: f64, end: f64) -> Self {
        PhaseSpan { phase, start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rising,
    Falling,
}

/// Time at which a series crosses a threshold, linearly interpolated between samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub time: f64,
    pub direction: Direction,
}

/// Thresholds used by [detect]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCriteria {
    /// Healthy T-cell count marking the onset of AIDS
    pub aids_threshold: f64,
    /// Smallest viral load accepted as a peak (mm⁻³)
    pub min_peak: f64,
    /// Smallest peak accepted, as a fraction of the largest viral load in the trajectory
    ///
    /// Local maxima below this are integration noise around zero.
    pub peak_fraction: f64,
}

impl Default for PhaseCriteria {
    fn default() -> Self {
        PhaseCriteria {
            aids_threshold: AIDS_THRESHOLD,
            min_peak: 1.0,
            peak_fraction: 0.01,
        }
    }
}

impl PhaseCriteria {
    /// Viral load a local maximum must reach to count as a peak in `values`
    pub fn peak_floor(&self, values: &[f64]) -> f64 {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        self.min_peak.max(self.peak_fraction * max)
    }
}

/// Phase boundaries found in a trajectory
///
/// `None` means the boundary was not reached within the simulated horizon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseBoundaries {
    /// First significant peak of the viral load
    pub acute_end: Option<f64>,
    /// First time healthy T-cells fall below the AIDS threshold
    pub aids_onset: Option<f64>,
}

impl PhaseBoundaries {
    /// Contiguous phase annotations over `[t0, tf]`
    pub fn spans(&self, t0: f64, tf: f64) -> Vec<PhaseSpan> {
        let mut spans = vec![];
        let chronic_start = match self.acute_end {
            Some(end) => {
                spans.push(PhaseSpan::new(Phase::Acute, t0, end));
                end
            }
            None => return spans,
        };
        match self.aids_onset {
            Some(onset) if onset > chronic_start => {
                spans.push(PhaseSpan::new(Phase::Chronic, chronic_start, onset));
                spans.push(PhaseSpan::new(Phase::Aids, onset, tf));
            }
            Some(_) => spans.push(PhaseSpan::new(Phase::Aids, chronic_start, tf)),
            None => spans.push(PhaseSpan::new(Phase::Chronic, chronic_start, tf)),
        }
        spans
    }
}

/// All crossings of `threshold` by one compartment
pub fn crossings(trajectory: &Trajectory, compartment: Compartment, threshold: f64) -> Vec<Crossing> {
    let times = trajectory.times();
    let values = trajectory.series(compartment);
    let mut found = vec![];
    for i in 1..values.len() {
        let (y0, y1) = (values[i - 1] - threshold, values[i] - threshold);
        let direction = if y0 < 0.0 && y1 >= 0.0 {
            Direction::Rising
        } else if y0 >= 0.0 && y1 < 0.0 {
            Direction::Falling
        } else {
            continue;
        };
        let (t0, t1) = (times[i - 1], times[i]);
        let time = t0 + (t1 - t0) * y0 / (y0 - y1);
        found.push(Crossing { time, direction });
    }
    found
}

/// Time of the first interior local maximum of one compartment that reaches `floor`
pub fn first_peak(trajectory: &Trajectory, compartment: Compartment, floor: f64) -> Option<f64> {
    let values = trajectory.series(compartment);
    let times = trajectory.times();
    let mut i = 1;
    while i + 1 < values.len() {
        if values[i] > values[i - 1] && values[i] >= floor {
            // Walk across a flat top before deciding
            let mut j = i;
            while j + 1 < values.len() && values[j + 1] == values[i] {
                j += 1;
            }
            if j + 1 < values.len() && values[j + 1] < values[i] {
                return Some(times[i]);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    None
}

/// Derive phase boundaries from a finished trajectory
///
/// The acute phase ends at the first peak of the viral load above
/// [PhaseCriteria::peak_floor], AIDS starts when healthy T-cells first drop below
/// `criteria.aids_threshold`.
pub fn detect(trajectory: &Trajectory, criteria: &PhaseCriteria) -> PhaseBoundaries {
    let floor = criteria.peak_floor(&trajectory.series(Compartment::Virus));
    let acute_end = first_peak(trajectory, Compartment::Virus, floor);
    let aids_onset = crossings(trajectory, Compartment::Healthy, criteria.aids_threshold)
        .into_iter()
        .find(|c| c.direction == Direction::Falling)
        .map(|c| c.time);
    PhaseBoundaries {
        acute_end,
        aids_onset,
    }
}
