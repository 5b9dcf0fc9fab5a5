use csv::Writer;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::analysis::{FlowRecord, FEATURE_NAMES};
use crate::utils::error::AppResult;

/// Header of the classification file
pub const CLASSIFICATION_HEADER: [&str; 7] = [
    "SrcIP",
    "DstIP",
    "Protocol",
    "SrcPort",
    "DstPort",
    "Probability",
    "Label",
];

/// Write one row of features per flow, in feature vector order.
///
/// Counts, sums and extremes of packet sizes are written as integers, every
/// other column with three decimals.
pub fn write_features<W: Write>(writer: &mut Writer<W>, records: &[FlowRecord]) -> AppResult<()> {
    writer.write_record(FEATURE_NAMES)?;

    for record in records {
        let row = record
            .features
            .to_vector()
            .into_iter()
            .enumerate()
            .map(|(i, value)| match i {
                1 | 2 | 3 | 5 | 6 | 8 => format!("{}", value as i64),
                _ => format!("{:.3}", value),
            });
        writer.write_record(row)?;
    }

    Ok(())
}

/// Write the verdict of every scored flow; unscored flows are left out
pub fn write_classifications<W: Write>(writer: &mut Writer<W>, records: &[FlowRecord]) -> AppResult<()> {
    writer.write_record(CLASSIFICATION_HEADER)?;

    for result in records.iter().filter_map(|r| r.result.as_ref()) {
        let [src, dst, proto, sport, dport] = result.key.parts();
        writer.write_record([
            src,
            dst,
            proto,
            sport,
            dport,
            format!("{:.6}", result.probability),
            result.label.to_string(),
        ])?;
    }

    Ok(())
}

/// Create `path` and fill it with `write`
pub fn write_file<F>(path: &Path, records: &[FlowRecord], write: F) -> AppResult<()>
where
    F: FnOnce(&mut Writer<File>, &[FlowRecord]) -> AppResult<()>,
{
    let mut writer = Writer::from_path(path)?;
    write(&mut writer, records)?;
    writer.flush()?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}
