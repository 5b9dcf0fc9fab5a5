use chrono::{DateTime, Duration, Utc};
use log::{debug, log_enabled, trace, Level};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::flow::key::FlowKey;
use crate::models::packet::Packet;

/// All packets observed for one key
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub key: FlowKey,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub packet_count: usize,
    pub byte_count: usize,
    /// Frame lengths in arrival order; `len() == packet_count`
    pub packet_sizes: Vec<usize>,
    /// Gaps between consecutive packets; `len() == packet_count - 1`
    pub iats: Vec<Duration>,
}

impl Flow {
    fn new(key: FlowKey, packet: &Packet) -> Self {
        Self {
            key,
            first_seen: packet.timestamp,
            last_seen: packet.timestamp,
            packet_count: 1,
            byte_count: packet.length,
            packet_sizes: vec![packet.length],
            iats: Vec::new(),
        }
    }

    /// Append a later packet. The gap is kept signed: a packet that is older
    /// than `last_seen` records a negative inter-arrival time.
    fn record(&mut self, packet: &Packet) {
        let iat = packet.timestamp.signed_duration_since(self.last_seen);
        self.iats.push(iat);
        self.packet_sizes.push(packet.length);
        self.packet_count += 1;
        self.byte_count += packet.length;
        self.last_seen = packet.timestamp;
    }
}

/// Aggregates packets into flows.
///
/// The table has a single owner; `ingest` takes `&mut self` so two writers can
/// never touch the same flow. Flows are never evicted.
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: HashMap<FlowKey, Flow>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one packet to the flow its key selects, creating the flow if needed
    pub fn ingest(&mut self, packet: &Packet) {
        let key = FlowKey::from_packet(packet);

        match self.flows.entry(key) {
            Entry::Vacant(entry) => {
                if log_enabled!(Level::Debug) {
                    debug!("New flow {}", entry.key());
                }
                let flow = Flow::new(entry.key().clone(), packet);
                entry.insert(flow);
            }
            Entry::Occupied(mut entry) => {
                let flow = entry.get_mut();
                flow.record(packet);
                if log_enabled!(Level::Trace) {
                    trace!("Flow {} now has {} packets", flow.key, flow.packet_count);
                }
            }
        }
    }

    /// Number of distinct flows seen so far
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Look up a flow while ingestion is still running
    pub fn get(&self, key: &FlowKey) -> Option<&Flow> {
        self.flows.get(key)
    }

    /// End ingestion and hand out every flow.
    ///
    /// Order follows the hash map and is not stable between runs; sort the
    /// result when a deterministic order is needed.
    pub fn finalize(self) -> Vec<Flow> {
        self.flows.into_values().collect()
    }
}
