use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trialc_core::{ConfigurationError, MAX_PORT, PortId};

/// Maps a reward magnitude at a given port to a valve open time.
///
/// The compiler treats the returned duration as opaque and authoritative.
pub trait ValveTime {
    fn valve_time_s(&self, magnitude_ul: f64, port: PortId) -> Result<f64, ConfigurationError>;
}

impl<F> ValveTime for F
where
    F: Fn(f64, PortId) -> f64,
{
    fn valve_time_s(&self, magnitude_ul: f64, port: PortId) -> Result<f64, ConfigurationError> {
        Ok(self(magnitude_ul, port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub volume_ul: f64,
    pub open_s: f64,
}

/// Per-port measured (volume, open time) points, keyed by physical channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    ports: BTreeMap<u8, Vec<CalibrationPoint>>,
}

impl CalibrationTable {
    /// Same linear rate on every port.
    pub fn flat(open_s_per_ul: f64) -> Self {
        let point = CalibrationPoint {
            volume_ul: 1.0,
            open_s: open_s_per_ul,
        };
        Self {
            ports: (1..=MAX_PORT).map(|ch| (ch, vec![point])).collect(),
        }
    }

    pub fn insert(&mut self, port: PortId, point: CalibrationPoint) {
        self.ports.entry(port.channel()).or_default().push(point);
    }

    fn points(&self, port: PortId) -> Result<Vec<CalibrationPoint>, ConfigurationError> {
        let mut points: Vec<CalibrationPoint> = self
            .ports
            .get(&port.channel())
            .map(|points| {
                points
                    .iter()
                    .copied()
                    .filter(|p| p.volume_ul.is_finite() && p.open_s.is_finite())
                    .collect()
            })
            .unwrap_or_default();
        if points.is_empty() {
            return Err(ConfigurationError::MissingCalibration { port });
        }
        points.sort_by(|a, b| a.volume_ul.total_cmp(&b.volume_ul));
        Ok(points)
    }
}

impl ValveTime for CalibrationTable {
    /// Interpolates linearly between the two nearest points, extrapolating
    /// from the end segments. A single point scales through the origin.
    fn valve_time_s(&self, magnitude_ul: f64, port: PortId) -> Result<f64, ConfigurationError> {
        let points = self.points(port)?;

        let open_s = match points.as_slice() {
            [only] if only.volume_ul > 0.0 => only.open_s * magnitude_ul / only.volume_ul,
            [only] => only.open_s,
            _ => {
                let upper = points
                    .iter()
                    .position(|p| p.volume_ul >= magnitude_ul)
                    .unwrap_or(points.len() - 1)
                    .max(1);
                let (a, b) = (points[upper - 1], points[upper]);
                let span = b.volume_ul - a.volume_ul;
                if span <= 0.0 {
                    a.open_s
                } else {
                    a.open_s + (magnitude_ul - a.volume_ul) * (b.open_s - a.open_s) / span
                }
            }
        };
        Ok(open_s.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(n: u8) -> PortId {
        PortId::new(n).unwrap()
    }

    fn table() -> CalibrationTable {
        let mut table = CalibrationTable::default();
        for (volume_ul, open_s) in [(4.0, 0.2), (2.0, 0.12), (8.0, 0.36)] {
            table.insert(port(1), CalibrationPoint { volume_ul, open_s });
        }
        table
    }

    #[test]
    fn interpolates_between_points() {
        let t = table().valve_time_s(3.0, port(1)).unwrap();
        assert!((t - 0.16).abs() < 1e-12);
    }

    #[test]
    fn extrapolates_from_end_segments() {
        let low = table().valve_time_s(1.0, port(1)).unwrap();
        assert!((low - 0.08).abs() < 1e-12);
        let high = table().valve_time_s(10.0, port(1)).unwrap();
        assert!((high - 0.44).abs() < 1e-12);
        assert_eq!(table().valve_time_s(-50.0, port(1)).unwrap(), 0.0);
    }

    #[test]
    fn missing_port_is_a_configuration_error() {
        assert_eq!(
            table().valve_time_s(2.0, port(3)),
            Err(ConfigurationError::MissingCalibration { port: port(3) })
        );
    }

    #[test]
    fn flat_table_scales_linearly() {
        let flat = CalibrationTable::flat(0.05);
        let t = flat.valve_time_s(3.0, port(MAX_PORT)).unwrap();
        assert!((t - 0.15).abs() < 1e-12);
    }

    #[test]
    fn table_loads_from_json() {
        let table: CalibrationTable =
            serde_json::from_str(r#"{ "2": [ { "volume_ul": 2.0, "open_s": 0.1 } ] }"#).unwrap();
        let t = table.valve_time_s(4.0, port(2)).unwrap();
        assert!((t - 0.2).abs() < 1e-12);
    }
}
