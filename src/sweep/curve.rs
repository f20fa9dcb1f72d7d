//! # IV curve
//!
//! Ordered trajectory of solved operating points. Entries keep the sweep
//! order; a sample that failed to solve stays in place as an explicit
//! [`SweepEntry::Failed`] marker so indices line up with the input schedule.

use serde::Serialize;

use crate::solver::OperatingPoint;

/// Sample that could not be solved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSample {
    pub index: usize,
    pub time: f64,
    pub load_resistance: f64,
    pub light_current: f64,
    pub reason: String,
}

/// One entry of the curve, in sweep order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SweepEntry {
    Solved(OperatingPoint),
    Failed(FailedSample),
}

impl SweepEntry {
    pub fn operating_point(&self) -> Option<&OperatingPoint> {
        match self {
            SweepEntry::Solved(op) => Some(op),
            SweepEntry::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SweepEntry::Failed(_))
    }
}

/// Maximum power point of a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaxPowerPoint {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub load_resistance: f64,
}

/// Headline figures of an IV curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveSummary {
    pub samples: usize,
    pub failures: usize,
    pub short_circuit_current: Option<f64>,
    pub open_circuit_voltage: Option<f64>,
    pub max_power_point: Option<MaxPowerPoint>,
    pub fill_factor: Option<f64>,
}

/// Ordered sequence of sweep results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IvCurve {
    entries: Vec<SweepEntry>,
}

impl IvCurve {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, entry: SweepEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Solved operating points in sweep order
    pub fn solved(&self) -> impl Iterator<Item = &OperatingPoint> + '_ {
        self.entries.iter().filter_map(SweepEntry::operating_point)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailedSample> + '_ {
        self.entries.iter().filter_map(|e| match e {
            SweepEntry::Failed(f) => Some(f),
            SweepEntry::Solved(_) => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Terminal voltages of the solved points
    pub fn voltages(&self) -> Vec<f64> {
        self.solved().map(|op| op.voltage).collect()
    }

    pub fn currents(&self) -> Vec<f64> {
        self.solved().map(|op| op.current).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.solved().map(|op| op.time).collect()
    }

    /// Current at the smallest load in the sweep
    pub fn short_circuit_current(&self) -> Option<f64> {
        self.solved()
            .min_by(|a, b| a.load_resistance.total_cmp(&b.load_resistance))
            .map(|op| op.current)
    }

    /// Voltage at the largest load in the sweep
    pub fn open_circuit_voltage(&self) -> Option<f64> {
        self.solved()
            .max_by(|a, b| a.load_resistance.total_cmp(&b.load_resistance))
            .map(|op| op.voltage)
    }

    pub fn max_power_point(&self) -> Option<MaxPowerPoint> {
        self.solved()
            .max_by(|a, b| a.power().total_cmp(&b.power()))
            .map(|op| MaxPowerPoint {
                voltage: op.voltage,
                current: op.current,
                power: op.power(),
                load_resistance: op.load_resistance,
            })
    }

    /// P_mpp / (I_sc · V_oc)
    pub fn fill_factor(&self) -> Option<f64> {
        let isc = self.short_circuit_current()?;
        let voc = self.open_circuit_voltage()?;
        let mpp = self.max_power_point()?;
        let denom = isc * voc;
        (denom > 0.0).then(|| mpp.power / denom)
    }

    pub fn summary(&self) -> CurveSummary {
        CurveSummary {
            samples: self.len(),
            failures: self.failure_count(),
            short_circuit_current: self.short_circuit_current(),
            open_circuit_voltage: self.open_circuit_voltage(),
            max_power_point: self.max_power_point(),
            fill_factor: self.fill_factor(),
        }
    }

    /// Render as CSV, one row per entry, failed rows filled with NaN
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(
            "time,voltage,current,node_voltage,load_resistance,light_current,status\n",
        );
        for entry in &self.entries {
            let row = match entry {
                SweepEntry::Solved(op) => format!(
                    "{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},solved",
                    op.time,
                    op.voltage,
                    op.current,
                    op.node_voltage,
                    op.load_resistance,
                    op.light_current
                ),
                SweepEntry::Failed(f) => format!(
                    "{:.9e},NaN,NaN,NaN,{:.9e},{:.9e},failed",
                    f.time, f.load_resistance, f.light_current
                ),
            };
            csv.push_str(&row);
            csv.push('\n');
        }
        csv
    }

    pub fn write_csv(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }
}

impl FromIterator<SweepEntry> for IvCurve {
    fn from_iter<T: IntoIterator<Item = SweepEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
