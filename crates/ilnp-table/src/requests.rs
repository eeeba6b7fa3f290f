//! Bookkeeping for reactive route discovery: a ring buffer that suppresses duplicate
//! `LOCATOR_RREQ` floods, and per-destination retry/backoff state for requests this node
//! originated.
//!
//! Grounded on `interzone.py::RecentlySeenRequests`/`RequestRecord`/`CurrentRequestBuffer`.

use ilnp_proto::IlnpPacket;
use std::collections::{
    HashMap,
    VecDeque,
};

/// How many `(src_id, request_id)` pairs are remembered for duplicate-flood suppression.
const CAPACITY: usize = 15;

/// How many maintenance ticks an unanswered request waits before being retried.
pub const AGE_UNTIL_RETRY: u32 = 3;

/// How many retries are attempted before a request is given up on.
pub const MAX_RETRIES: u32 = 3;

/// Fixed-capacity FIFO of recently seen `(src_id, request_id)` pairs, used to drop a
/// `LOCATOR_RREQ` flood this node has already forwarded once.
#[derive(Debug, Clone)]
pub struct RecentRequests {
    seen: VecDeque<(u64, u64)>,
}

impl Default for RecentRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentRequests {
    pub fn new() -> Self {
        Self {
            seen: VecDeque::with_capacity(CAPACITY),
        }
    }

    pub fn record(&mut self, src_id: u64, request_id: u64) {
        log::info!("recording ({src_id}, {request_id}) in recently seen requests");
        self.seen.push_front((src_id, request_id));
        self.seen.truncate(CAPACITY);
    }

    pub fn contains(&self, src_id: u64, request_id: u64) -> bool {
        self.seen.contains(&(src_id, request_id))
    }
}

/// Retry state for a request this node originated while waiting for a reply.
#[derive(Debug, Default, Clone)]
pub struct RequestRecord {
    pub num_attempts: u32,
    pub last_request_id: u16,
    pub time_since_last_attempt: u32,
    pub waiting_packets: Vec<IlnpPacket>,
}

impl RequestRecord {
    fn new(last_request_id: u16) -> Self {
        Self {
            num_attempts: 0,
            last_request_id,
            time_since_last_attempt: 0,
            waiting_packets: Vec::new(),
        }
    }

    pub fn record_retry(&mut self, new_request_id: u16) {
        self.num_attempts += 1;
        self.last_request_id = new_request_id;
    }
}

/// Tracks the one outstanding route request per destination id, and the packets buffered while
/// waiting for it to be answered.
#[derive(Debug, Default, Clone)]
pub struct PendingRequests {
    records: HashMap<u64, RequestRecord>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, destination_id: u64) -> bool {
        self.records.contains_key(&destination_id)
    }

    pub fn add_new_request(&mut self, destination_id: u64, request_id: u16) {
        log::info!("recording new request {request_id} for destination {destination_id}");
        self.records.insert(destination_id, RequestRecord::new(request_id));
    }

    pub fn buffer_packet(&mut self, destination_id: u64, packet: IlnpPacket) {
        if let Some(record) = self.records.get_mut(&destination_id) {
            record.waiting_packets.push(packet);
        }
    }

    pub fn get(&self, destination_id: u64) -> Option<&RequestRecord> {
        self.records.get(&destination_id)
    }

    pub fn record_retried_request(&mut self, destination_id: u64, new_request_id: u16) {
        if let Some(record) = self.records.get_mut(&destination_id) {
            record.record_retry(new_request_id);
        }
    }

    pub fn age_records(&mut self) {
        for record in self.records.values_mut() {
            record.time_since_last_attempt += 1;
        }
    }

    pub fn destinations_older_than(&self, age: u32) -> Vec<u64> {
        self.records
            .iter()
            .filter(|(_, record)| record.time_since_last_attempt > age)
            .map(|(destination_id, _)| *destination_id)
            .collect()
    }

    pub fn remove(&mut self, destination_id: u64) -> Option<RequestRecord> {
        self.records.remove(&destination_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &RequestRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_requests_forgets_past_capacity() {
        let mut recent = RecentRequests::new();
        for request_id in 0..20u64 {
            recent.record(1, request_id);
        }
        assert!(!recent.contains(1, 0));
        assert!(recent.contains(1, 19));
    }

    #[test]
    fn pending_requests_buffers_packets_for_known_destination() {
        use ilnp_common::Address;
        use ilnp_proto::header::NextHeader;

        let mut pending = PendingRequests::new();
        pending.add_new_request(42, 7);

        let packet = IlnpPacket::new(Address::new(1, 1), Address::with_unknown_locator(42), NextHeader::Data, 32, Vec::new());
        pending.buffer_packet(42, packet);

        assert_eq!(pending.get(42).unwrap().waiting_packets.len(), 1);
    }

    #[test]
    fn ages_out_past_retry_threshold() {
        let mut pending = PendingRequests::new();
        pending.add_new_request(1, 1);
        for _ in 0..(AGE_UNTIL_RETRY + 1) {
            pending.age_records();
        }
        assert_eq!(pending.destinations_older_than(AGE_UNTIL_RETRY), vec![1]);
    }
}
