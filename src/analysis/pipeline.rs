use log::{info, warn};

use crate::analysis::features::{extract, FlowFeatures};
use crate::flow::{Flow, FlowKey};
use crate::ml::{ClassificationResult, Model};

/// One finished flow with its features and, when a model is loaded, its score
#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub key: FlowKey,
    pub features: FlowFeatures,
    pub result: Option<ClassificationResult>,
}

/// Summarize and score finalized flows.
///
/// Records come back ordered by first packet time, then by key, so output
/// files are stable across runs. A flow whose vector does not fit the model
/// is kept unscored.
pub fn score_flows(mut flows: Vec<Flow>, model: Option<&Model>) -> Vec<FlowRecord> {
    flows.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.key.cmp(&b.key)));

    let records: Vec<FlowRecord> = flows
        .into_iter()
        .map(|flow| {
            let features = extract(&flow);
            let result = model.and_then(|model| match model.classify(&flow.key, &features.to_vector()) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Skipping classification of flow {}: {}", flow.key, e);
                    None
                }
            });
            FlowRecord {
                key: flow.key,
                features,
                result,
            }
        })
        .collect();

    info!("Computed features for {} flows", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FEATURE_COUNT;
    use crate::flow::FlowTable;
    use crate::ml::Label;
    use crate::models::packet::{Packet, Protocol};
    use chrono::{TimeZone, Utc};

    fn table() -> FlowTable {
        let mut table = FlowTable::new();
        let at = |ms| Utc.timestamp_millis_opt(ms).unwrap();
        let a = "10.0.0.1".parse().unwrap();
        let b = "10.0.0.2".parse().unwrap();
        table.ingest(&Packet::new(at(30), 60).with_addresses(b, a).with_transport(Protocol::Udp, 53, 5353));
        table.ingest(&Packet::new(at(10), 60).with_addresses(a, b).with_transport(Protocol::Tcp, 1234, 80));
        table.ingest(&Packet::new(at(10), 80).with_addresses(a, b).with_transport(Protocol::Udp, 5353, 53));
        table.ingest(&Packet::new(at(40), 90).with_addresses(a, b).with_transport(Protocol::Tcp, 1234, 80));
        table
    }

    #[test]
    fn test_records_are_sorted() {
        let records = score_flows(table().finalize(), None);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].key.protocol, Some(Protocol::Tcp));
        assert_eq!(records[0].features.packet_count, 2);
        assert_eq!(records[1].key.protocol, Some(Protocol::Udp));
        assert_eq!(records[1].key.src_port, Some(5353));
        assert_eq!(records[2].key.src_port, Some(53));
        assert!(records.iter().all(|r| r.result.is_none()));
    }

    #[test]
    fn test_records_are_scored() {
        // only PacketCount carries weight
        let mut weights = vec![0.0; FEATURE_COUNT];
        weights[1] = 5.0;
        let model = Model::new(weights, 0.0,vec![1.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]).unwrap();

        let records = score_flows(table().finalize(), Some(&model));
        let tcp = records[0].result.as_ref().unwrap();
        assert_eq!(tcp.key, records[0].key);
        assert_eq!(tcp.label, Label::Malicious);
        let udp = records[1].result.as_ref().unwrap();
        assert_eq!(udp.probability, 0.5);
        assert_eq!(udp.label, Label::Benign);
    }

    #[test]
    fn test_mismatched_model_leaves_flows_unscored() {
        let model = Model::new(vec![1.0; 4], 0.0, vec![0.0; 4], vec![1.0; 4]).unwrap();
        let records = score_flows(table().finalize(), Some(&model));
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.result.is_none()));
    }
}
