use crate::error::{XfResult, XrayFitError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ScanType {
    Reflectivity,
    Energy,
}

/// Measurement channel; selects which simulated curve a scan is compared with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Polarization {
    S,
    P,
    LC,
    RC,
    /// Linear asymmetry (S - P) / (S + P)
    AL,
    /// Circular asymmetry (LC - RC) / (LC + RC)
    AC,
}

impl Polarization {
    pub fn is_asymmetry(self) -> bool {
        matches!(self, Polarization::AL | Polarization::AC)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_number: u32,
    pub scan_type: ScanType,
    pub name: String,
    pub polarization: Polarization,
    /// Photon energy in eV (reflectivity scans).
    #[serde(default)]
    pub energy: Option<f64>,
    /// Grazing angle in degrees (energy scans).
    #[serde(default)]
    pub angle: Option<f64>,
}

impl ScanRecord {
    pub fn energy(&self) -> XfResult<f64> {
        self.energy.ok_or_else(|| {
            XrayFitError::Validation(format!(
                "Reflectivity scan {} ('{}') has no photon energy",
                self.scan_number, self.name
            ))
        })
    }

    pub fn angle(&self) -> XfResult<f64> {
        self.angle.ok_or_else(|| {
            XrayFitError::Validation(format!(
                "Energy scan {} ('{}') has no angle",
                self.scan_number, self.name
            ))
        })
    }
}

/// Column data of one scan: one row per measured point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanData {
    pub qz: Vec<f64>,
    pub theta: Vec<f64>,
    pub reflectivity: Vec<f64>,
    pub energy: Vec<f64>,
}

impl ScanData {
    /// The independent variable of the scan: qz for reflectivity, energy for energy scans.
    pub fn axis(&self, scan_type: ScanType) -> &[f64] {
        match scan_type {
            ScanType::Reflectivity => &self.qz,
            ScanType::Energy => &self.energy,
        }
    }

    /// First and last axis value, the default fitting window of a scan.
    pub fn axis_range(&self, scan_type: ScanType) -> Option<(f64, f64)> {
        let axis = self.axis(scan_type);
        Some((*axis.first()?, *axis.last()?))
    }

    pub fn len(&self) -> usize {
        self.reflectivity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflectivity.is_empty()
    }

    pub fn check_shape(&self, name: &str, scan_type: ScanType) -> XfResult<()> {
        let axis = self.axis(scan_type).len();
        if axis != self.reflectivity.len() {
            return Err(XrayFitError::MismatchedLengths(format!(
                "scan '{}' has {} axis points but {} reflectivity values",
                name,
                axis,
                self.reflectivity.len()
            )));
        }
        Ok(())
    }
}

/// Everything loaded for one fit session: scan index plus measured and simulated curves by scan name.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<ScanRecord>,
    pub measured: BTreeMap<String, ScanData>,
    pub simulated: BTreeMap<String, ScanData>,
}

impl Dataset {
    pub fn record(&self, scan_number: u32) -> XfResult<&ScanRecord> {
        self.records
            .iter()
            .find(|r| r.scan_number == scan_number)
            .ok_or(XrayFitError::OutOfRangeScan(scan_number))
    }

    pub fn measured(&self, name: &str) -> XfResult<&ScanData> {
        self.measured
            .get(name)
            .ok_or_else(|| XrayFitError::MissingScanData(name.to_string()))
    }

    pub fn simulated(&self, name: &str) -> XfResult<&ScanData> {
        self.simulated
            .get(name)
            .ok_or_else(|| XrayFitError::MissingScanData(name.to_string()))
    }

    /// Resolves scan numbers into records, keeping the requested order.
    pub fn resolve(&self, scans: &[u32]) -> XfResult<Vec<ScanRecord>> {
        scans.iter().map(|&n| self.record(n).cloned()).collect()
    }

    pub fn scan_numbers(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.scan_number).collect()
    }
}
