use crate::scan::ScanType;
use serde::Serialize;

/// Residual of one scan and how many measured points entered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanContribution {
    pub scan_number: u32,
    pub name: String,
    pub scan_type: ScanType,
    pub chi2: f64,
    pub points_used: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ScoreDetails {
    pub total: f64,
    pub scans: Vec<ScanContribution>,
}

impl ScoreDetails {
    pub fn push(&mut self, c: ScanContribution) {
        self.total += c.chi2;
        self.scans.push(c);
    }

    pub fn contribution(&self, scan_number: u32) -> Option<&ScanContribution> {
        self.scans.iter().find(|c| c.scan_number == scan_number)
    }
}
