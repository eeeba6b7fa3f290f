//! The mock sensor payload and sink-side log used only by the CLI demo loop, never by the
//! routing core. Grounded on `sensor/datagenerator.py::MockDataGenerator`/`SensorReading`/
//! `SinkLog`.

use csv::Writer;
use rand::Rng;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    pub origin_id: u64,
    pub temperature_kelvin: f32,
    pub humidity_percent: u8,
    pub pressure_hpa: u16,
    pub luminosity: u8,
}

impl SensorReading {
    pub const ENCODED_LEN: usize = 8 + 4 + 1 + 2 + 1;

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::ENCODED_LEN);
        buffer.extend_from_slice(&self.origin_id.to_be_bytes());
        buffer.extend_from_slice(&self.temperature_kelvin.to_be_bytes());
        buffer.push(self.humidity_percent);
        buffer.extend_from_slice(&self.pressure_hpa.to_be_bytes());
        buffer.push(self.luminosity);
        buffer
    }

    pub fn unpack(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            origin_id: u64::from_be_bytes(bytes[0..8].try_into().ok()?),
            temperature_kelvin: f32::from_be_bytes(bytes[8..12].try_into().ok()?),
            humidity_percent: bytes[12],
            pressure_hpa: u16::from_be_bytes(bytes[13..15].try_into().ok()?),
            luminosity: bytes[15],
        })
    }
}

/// Produces a plausible next reading by a small random walk from the previous one, clamped to
/// sensible ranges.
pub struct MockSensorGenerator {
    last_reading: SensorReading,
}

impl MockSensorGenerator {
    pub fn new(origin_id: u64) -> Self {
        Self {
            last_reading: SensorReading {
                origin_id,
                temperature_kelvin: 273.15,
                humidity_percent: 50,
                pressure_hpa: 900,
                luminosity: 2,
            },
        }
    }

    pub fn next_reading(&mut self) -> SensorReading {
        let mut rng = rand::rng();
        let previous = self.last_reading;

        let temperature_kelvin = (previous.temperature_kelvin + (rng.random::<f32>() * 2.0 - 1.0)).max(0.0);
        let humidity_percent = previous.humidity_percent.saturating_add_signed(rng.random_range(-5i8..=5)).min(100);
        let pressure_hpa = previous.pressure_hpa.saturating_add_signed(rng.random_range(-5i16..=5));
        let luminosity = previous.luminosity.saturating_add_signed(rng.random_range(-1i8..=1)).min(12);

        self.last_reading = SensorReading {
            origin_id: previous.origin_id,
            temperature_kelvin,
            humidity_percent,
            pressure_hpa,
            luminosity,
        };
        self.last_reading
    }
}

/// Accumulates readings delivered to the sink node, flushed to CSV once at shutdown.
#[derive(Debug, Default)]
pub struct SinkLog {
    readings: Vec<SensorReading>,
}

impl SinkLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, reading: SensorReading) {
        self.readings.push(reading);
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let write_header = !path.exists() || std::fs::metadata(path).map(|metadata| metadata.len() == 0).unwrap_or(true);

        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = Writer::from_writer(file);
        if write_header {
            writer.write_record(["origin_id", "temperature", "humidity", "pressure", "luminosity"])?;
        }
        for reading in &self.readings {
            writer.serialize(reading).map_err(std::io::Error::other)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_round_trips_through_wire_format() {
        let reading = SensorReading {
            origin_id: 7,
            temperature_kelvin: 300.5,
            humidity_percent: 42,
            pressure_hpa: 1013,
            luminosity: 5,
        };
        let bytes = reading.pack();
        assert_eq!(SensorReading::unpack(&bytes), Some(reading));
    }

    #[test]
    fn generator_stays_within_clamped_ranges() {
        let mut generator = MockSensorGenerator::new(1);
        for _ in 0..200 {
            let reading = generator.next_reading();
            assert!(reading.temperature_kelvin >= 0.0);
            assert!(reading.humidity_percent <= 100);
            assert!(reading.luminosity <= 12);
        }
    }

    #[test]
    fn sink_log_accumulates_readings() {
        let mut log = SinkLog::new();
        log.record(SensorReading {
            origin_id: 1,
            temperature_kelvin: 280.0,
            humidity_percent: 10,
            pressure_hpa: 1000,
            luminosity: 1,
        });
        assert_eq!(log.readings.len(), 1);
    }
}
