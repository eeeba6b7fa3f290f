//! Append-only record of every packet this node sent or forwarded, flushed to CSV once at
//! shutdown.
//!
//! Grounded on `sensor/packetmonitor.py::Monitor`/`PacketEntry`. The original's `fcntl`
//! exclusive-lock retry loop exists only to let several independent OS processes append to one
//! shared results file; this daemon is a single process per node, so the Rust port collapses that
//! to one `csv::Writer` append at clean shutdown.

use csv::Writer;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize)]
pub enum PacketKind {
    Control,
    Data,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketEntry {
    pub node_id: u64,
    pub sent_at_unix_secs: u64,
    pub packet_type: PacketKind,
    pub forwarded: bool,
}

#[derive(Debug, Default)]
pub struct Monitor {
    node_id: u64,
    entries: std::sync::Mutex<Vec<PacketEntry>>,
}

impl Monitor {
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id,
            entries: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn record_sent_packet(&self, sent_at_unix_secs: u64, is_control_message: bool, forwarded: bool) {
        let entry = PacketEntry {
            node_id: self.node_id,
            sent_at_unix_secs,
            packet_type: if is_control_message { PacketKind::Control } else { PacketKind::Data },
            forwarded,
        };
        self.entries.lock().expect("monitor entries poisoned").push(entry);
    }

    /// Number of packets recorded so far. Lets callers observe how many sends a node actually
    /// made without waiting for a `save()` to a results file.
    pub fn sent_packet_count(&self) -> usize {
        self.entries.lock().expect("monitor entries poisoned").len()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let write_header = !path.exists() || std::fs::metadata(path).map(|metadata| metadata.len() == 0).unwrap_or(true);

        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = Writer::from_writer(file);
        if write_header {
            writer.write_record(["node_id", "sent_at_time", "packet_type", "forwarded"])?;
        }

        for entry in self.entries.lock().expect("monitor entries poisoned").iter() {
            writer.serialize(entry).map_err(std::io::Error::other)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_packets_in_order() {
        let monitor = Monitor::new(1);
        monitor.record_sent_packet(100, true, false);
        monitor.record_sent_packet(101, false, true);
        assert_eq!(monitor.entries.lock().unwrap().len(), 2);
    }

    #[test]
    fn save_writes_header_once_on_new_file() {
        let dir = std::env::temp_dir().join(format!("ilnpd-monitor-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("results.csv");

        let monitor = Monitor::new(7);
        monitor.record_sent_packet(1, true, false);
        monitor.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("node_id,sent_at_time,packet_type,forwarded"));
        assert_eq!(contents.lines().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
