use crate::bounds::{ParameterBound, RegionSet, ScanBounds};
use crate::error::{XfResult, XrayFitError};
use crate::params::ParameterDescriptor;
use crate::scan::ScanRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output of the scan selection wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSelection {
    pub scans: Vec<u32>,
    pub scan_bounds: ScanBounds,
}

impl ScanSelection {
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn commit(&mut self, scan: u32, regions: RegionSet) {
        self.scans.push(scan);
        self.scan_bounds.insert(scan, regions);
    }
}

/// Output of the parameter selection wizard: descriptors and their search bounds, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSelection {
    pub descriptors: Vec<ParameterDescriptor>,
    pub bounds: Vec<ParameterBound>,
}

impl ParameterSelection {
    pub fn push(&mut self, descriptor: ParameterDescriptor, bound: ParameterBound) {
        self.descriptors.push(descriptor);
        self.bounds.push(bound);
    }

    pub fn contains(&self, descriptor: &ParameterDescriptor) -> bool {
        self.descriptors.contains(descriptor)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Everything the optimization driver needs besides the data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FitPlan {
    pub scans: Vec<u32>,
    pub scan_bounds: ScanBounds,
    pub parameters: Vec<ParameterDescriptor>,
    pub bounds: Vec<ParameterBound>,
}

/// On-disk form of a plan: parallel per-scan lists, validated on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFitPlan {
    pub scans: Vec<u32>,
    pub regions: Vec<Vec<(f64, f64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<Vec<f64>>>,
    pub parameters: Vec<ParameterDescriptor>,
    pub bounds: Vec<(f64, f64)>,
}

impl FitPlan {
    pub fn new(scans: ScanSelection, parameters: ParameterSelection) -> Self {
        Self {
            scans: scans.scans,
            scan_bounds: scans.scan_bounds,
            parameters: parameters.descriptors,
            bounds: parameters.bounds,
        }
    }

    pub fn from_raw(raw: RawFitPlan, records: &[ScanRecord]) -> XfResult<Self> {
        let scan_bounds =
            ScanBounds::from_raw(records, &raw.scans, &raw.regions, raw.weights.as_deref())?;

        if raw.parameters.len() != raw.bounds.len() {
            return Err(XrayFitError::MismatchedLengths(format!(
                "{} parameters but {} bounds",
                raw.parameters.len(),
                raw.bounds.len()
            )));
        }
        let bounds = raw
            .bounds
            .iter()
            .map(|&(l, u)| ParameterBound::new(l, u))
            .collect::<XfResult<Vec<_>>>()?;

        Ok(Self {
            scans: raw.scans,
            scan_bounds,
            parameters: raw.parameters,
            bounds,
        })
    }

    pub fn to_raw(&self) -> RawFitPlan {
        let sets: Vec<Option<&RegionSet>> =
            self.scans.iter().map(|s| self.scan_bounds.get(*s)).collect();
        RawFitPlan {
            scans: self.scans.clone(),
            regions: sets
                .iter()
                .map(|set| {
                    set.map(|s| s.regions().iter().map(|r| (r.lower, r.upper)).collect())
                        .unwrap_or_default()
                })
                .collect(),
            weights: Some(
                sets.iter()
                    .map(|set| set.map(|s| s.weights().to_vec()).unwrap_or_default())
                    .collect(),
            ),
            parameters: self.parameters.clone(),
            bounds: self.bounds.iter().map(|b| (b.lower, b.upper)).collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, records: &[ScanRecord]) -> XfResult<Self> {
        let content = fs::read_to_string(path)?;
        let raw: RawFitPlan = serde_json::from_str(&content)?;
        Self::from_raw(raw, records)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> XfResult<()> {
        fs::write(path, serde_json::to_string_pretty(&self.to_raw())?)?;
        Ok(())
    }

    /// Bound midpoints, the default evaluation point of a plan.
    pub fn midpoint(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.midpoint()).collect()
    }
}
