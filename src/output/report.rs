use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::analysis::{millis, FlowRecord, FEATURE_NAMES};
use crate::flow::FlowKey;
use crate::ml::Label;
use crate::utils::error::AppResult;

/// One flow in the JSON report
#[derive(Debug, Serialize)]
pub struct ReportEntry<'a> {
    pub flow: String,
    pub key: &'a FlowKey,
    pub features: BTreeMap<&'static str, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

impl<'a> From<&'a FlowRecord> for ReportEntry<'a> {
    fn from(record: &'a FlowRecord) -> Self {
        let features = FEATURE_NAMES
            .iter()
            .copied()
            .zip(record.features.to_vector())
            .collect();
        Self {
            flow: record.key.to_string(),
            key: &record.key,
            features,
            probability: record.result.as_ref().map(|r| r.probability),
            label: record.result.as_ref().map(|r| r.label),
        }
    }
}

/// Write every record as a pretty-printed JSON array
pub fn write_json<W: Write>(mut writer: W, records: &[FlowRecord]) -> AppResult<()> {
    let entries: Vec<ReportEntry> = records.iter().map(ReportEntry::from).collect();
    serde_json::to_writer_pretty(&mut writer, &entries)?;
    writer.flush()?;
    Ok(())
}

/// Verdict counts over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub flows: usize,
    pub benign: usize,
    pub malicious: usize,
    pub unscored: usize,
}

impl Tally {
    pub fn of(records: &[FlowRecord]) -> Self {
        records.iter().fold(Self::default(), |mut tally, record| {
            tally.flows += 1;
            match record.result.as_ref().map(|r| r.label) {
                Some(Label::Benign) => tally.benign += 1,
                Some(Label::Malicious) => tally.malicious += 1,
                None => tally.unscored += 1,
            }
            tally
        })
    }
}

/// Print every flow's features and verdict followed by the verdict counts,
/// with malicious verdicts highlighted when the terminal supports colour
pub fn print_summary(records: &[FlowRecord]) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_summary(&mut stdout, records)
}

pub fn write_summary<W: WriteColor>(out: &mut W, records: &[FlowRecord]) -> io::Result<()> {
    writeln!(out, "Computed features for {} flows:", records.len())?;

    for (i, record) in records.iter().enumerate() {
        let features = &record.features;
        let pkt = &features.packet_stats;
        let iat = &features.iat_stats;

        writeln!(out)?;
        writeln!(out, "Flow {}: {}", i + 1, record.key)?;
        writeln!(out, "  Duration: {:.3}ms", millis(features.duration))?;
        writeln!(out, "  Packet count: {}", features.packet_count)?;
        writeln!(
            out,
            "  Packet size: count={} mean={:.2} min={} max={} std={:.2}",
            pkt.count, pkt.mean, pkt.min, pkt.max, pkt.std
        )?;
        writeln!(
            out,
            "  IAT: count={} mean={:.3}ms min={:.3}ms max={:.3}ms std={:.3}ms",
            iat.count,
            millis(iat.mean),
            millis(iat.min),
            millis(iat.max),
            millis(iat.std)
        )?;

        match &record.result {
            Some(result) => {
                write!(out, "  Verdict: ")?;
                if result.label == Label::Malicious {
                    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                }
                write!(out, "{}", result.label)?;
                out.reset()?;
                writeln!(out, " (p={:.4})", result.probability)?;
            }
            None => writeln!(out, "  Verdict: unscored")?,
        }
    }

    let tally = Tally::of(records);
    writeln!(out)?;
    writeln!(
        out,
        "Flows: {}  benign: {}  malicious: {}  unscored: {}",
        tally.flows, tally.benign, tally.malicious, tally.unscored
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::score_flows;
    use crate::flow::FlowTable;
    use crate::ml::Model;
    use crate::models::packet::{Packet, Protocol};
    use chrono::{TimeZone, Utc};
    use termcolor::NoColor;

    fn records() -> Vec<FlowRecord> {
        let mut table = FlowTable::new();
        let at = |ms| Utc.timestamp_millis_opt(ms).unwrap();
        let packet = |ms, len, port| {
            Packet::new(at(ms), len)
                .with_addresses("10.1.1.1".parse().unwrap(), "10.2.2.2".parse().unwrap())
                .with_transport(Protocol::Tcp, port, 22)
        };
        table.ingest(&packet(0, 1500, 40001));
        table.ingest(&packet(1, 60, 40002));
        table.ingest(&Packet::new(at(2), 42));

        // malicious when PktSum is above 1000
        let n = FEATURE_NAMES.len();
        let mut weights = vec![0.0; n];
        weights[3] = 1.0;
        let mut means = vec![0.0; n];
        means[3] = 1000.0;
        let mut stds = vec![0.0; n];
        stds[3] = 1.0;
        let model = Model::new(weights, 0.0, means, stds).unwrap();

        let mut records = score_flows(table.finalize(), Some(&model));
        records[2].result = None;
        records
    }

    #[test]
    fn test_tally() {
        let tally = Tally::of(&records());
        assert_eq!(
            tally,
            Tally {
                flows: 3,
                benign: 1,
                malicious: 1,
                unscored: 1
            }
        );
    }

    fn summary(records: &[FlowRecord]) -> String {
        let mut out = NoColor::new(Vec::new());
        write_summary(&mut out, records).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_write_summary() {
        let text = summary(&records());

        assert!(text.starts_with("Computed features for 3 flows:\n\nFlow 1: 10.1.1.1-10.2.2.2-TCP-40001-22\n"));
        assert!(text.contains(
            "  Packet count: 1\n  Packet size: count=1 mean=1500.00 min=1500 max=1500 std=0.00\n"
        ));
        assert!(text.contains("  Verdict: malicious (p=1.0000)\n"));
        assert!(text.contains("Flow 2: 10.1.1.1-10.2.2.2-TCP-40002-22\n"));
        assert!(text.contains("  Verdict: benign (p=0.0000)\n"));
        assert!(text.contains("Flow 3: ----\n"));
        assert!(text.contains("  Verdict: unscored\n"));
        assert!(text.ends_with("\nFlows: 3  benign: 1  malicious: 1  unscored: 1\n"));
    }

    #[test]
    fn test_write_summary_without_model() {
        let mut table = FlowTable::new();
        for (ms, len) in [(0, 100), (10, 150), (25, 120)] {
            table.ingest(
                &Packet::new(Utc.timestamp_millis_opt(ms).unwrap(), len)
                    .with_addresses("192.168.0.10".parse().unwrap(), "1.1.1.1".parse().unwrap())
                    .with_transport(Protocol::Udp, 5353, 53),
            );
        }
        let text = summary(&score_flows(table.finalize(), None));

        let expected = "Flow 1: 192.168.0.10-1.1.1.1-UDP-5353-53\n\
                        \x20 Duration: 25.000ms\n\
                        \x20 Packet count: 3\n\
                        \x20 Packet size: count=3 mean=123.33 min=100 max=150 std=20.55\n\
                        \x20 IAT: count=2 mean=12.500ms min=10.000ms max=15.000ms std=2.500ms\n\
                        \x20 Verdict: unscored\n";
        assert!(text.contains(expected), "{}", text);
        assert!(text.ends_with("Flows: 1  benign: 0  malicious: 0  unscored: 1\n"));
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&mut out, &records()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["flow"], "10.1.1.1-10.2.2.2-TCP-40001-22");
        assert_eq!(entries[0]["label"], "malicious");
        assert_eq!(entries[0]["features"]["PktSum"], 1500.0);
        assert_eq!(entries[0]["key"]["protocol"], "TCP");
        assert!(entries[2].get("label").is_none());
    }
}
