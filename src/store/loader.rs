use crate::error::{XfResult, XrayFitError};
use crate::scan::{ScanData, ScanRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct DataRow {
    qz: f64,
    theta: f64,
    reflectivity: f64,
    energy: f64,
}

/// Scan index: `scan_number,scan_type,name,polarization,energy,angle`.
pub fn read_scan_index<R: Read>(reader: R) -> XfResult<Vec<ScanRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records: Vec<ScanRecord> = Vec::new();
    let mut seen = HashSet::new();
    for row in rdr.deserialize() {
        let record: ScanRecord = row?;
        if record.scan_number == 0 {
            return Err(XrayFitError::Validation(format!(
                "scan '{}' has number 0; scan numbers start at 1",
                record.name
            )));
        }
        if !seen.insert(record.scan_number) {
            return Err(XrayFitError::Validation(format!(
                "scan number {} appears twice in the index",
                record.scan_number
            )));
        }
        records.push(record);
    }
    Ok(records)
}

/// Scan columns, one row per point: `qz,theta,reflectivity,energy`.
pub fn read_scan_data<R: Read>(reader: R) -> XfResult<ScanData> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut data = ScanData::default();
    for row in rdr.deserialize() {
        let row: DataRow = row?;
        data.qz.push(row.qz);
        data.theta.push(row.theta);
        data.reflectivity.push(row.reflectivity);
        data.energy.push(row.energy);
    }
    Ok(data)
}

pub fn load_scan_index<P: AsRef<Path>>(path: P) -> XfResult<Vec<ScanRecord>> {
    debug!("Loading scan index from {}", path.as_ref().display());
    read_scan_index(File::open(path)?)
}

pub fn load_scan_data<P: AsRef<Path>>(path: P) -> XfResult<ScanData> {
    read_scan_data(File::open(path)?)
}

pub fn write_scan_index<W: Write>(writer: W, records: &[ScanRecord]) -> XfResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_scan_data<W: Write>(writer: W, data: &ScanData) -> XfResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for i in 0..data.len() {
        wtr.serialize(DataRow {
            qz: data.qz.get(i).copied().unwrap_or(0.0),
            theta: data.theta.get(i).copied().unwrap_or(0.0),
            reflectivity: data.reflectivity[i],
            energy: data.energy.get(i).copied().unwrap_or(0.0),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
