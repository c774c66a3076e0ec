use crate::error::{XfResult, XrayFitError};
use crate::scan::{ScanRecord, ScanType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed interval of the scan axis, both endpoints included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub lower: f64,
    pub upper: f64,
}

impl Region {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Ordered, weighted fitting windows of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegionSet", into = "RawRegionSet")]
pub struct RegionSet {
    regions: Vec<Region>,
    weights: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawRegionSet {
    regions: Vec<Region>,
    weights: Vec<f64>,
}

impl TryFrom<RawRegionSet> for RegionSet {
    type Error = XrayFitError;
    fn try_from(raw: RawRegionSet) -> XfResult<Self> {
        RegionSet::new(raw.regions, raw.weights)
    }
}

impl From<RegionSet> for RawRegionSet {
    fn from(set: RegionSet) -> Self {
        RawRegionSet {
            regions: set.regions,
            weights: set.weights,
        }
    }
}

impl RegionSet {
    pub fn new(regions: Vec<Region>, weights: Vec<f64>) -> XfResult<Self> {
        check_regions(&regions)?;
        check_weights(&weights, regions.len())?;
        Ok(Self { regions, weights })
    }

    /// Single window spanning the whole axis with weight 1.
    pub fn full_range(first: f64, last: f64) -> Self {
        Self {
            regions: vec![Region::new(first.min(last), first.max(last))],
            weights: vec![1.0],
        }
    }

    pub fn with_unit_weights(regions: Vec<Region>) -> XfResult<Self> {
        let weights = vec![1.0; regions.len()];
        Self::new(regions, weights)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Region, f64)> {
        self.regions.iter().zip(self.weights.iter().copied())
    }
}

/// Regions must be non-empty, each `lower <= upper`, strictly ascending and non-overlapping.
pub fn check_regions(regions: &[Region]) -> XfResult<()> {
    if regions.is_empty() {
        return Err(XrayFitError::Validation(
            "at least one boundary region is required".into(),
        ));
    }

    let mut previous: Option<&Region> = None;
    for r in regions {
        if !r.lower.is_finite() || !r.upper.is_finite() {
            return Err(XrayFitError::MalformedBoundary(format!(
                "({},{})",
                r.lower, r.upper
            )));
        }
        if r.lower > r.upper {
            return Err(XrayFitError::UnsortedBoundary(format!(
                "lower {} is above upper {}",
                r.lower, r.upper
            )));
        }
        if let Some(p) = previous {
            if p.upper > r.lower || p.lower >= r.lower {
                return Err(XrayFitError::UnsortedBoundary(format!(
                    "({},{}) overlaps or precedes ({},{})",
                    r.lower, r.upper, p.lower, p.upper
                )));
            }
        }
        previous = Some(r);
    }
    Ok(())
}

pub fn check_weights(weights: &[f64], expected: usize) -> XfResult<()> {
    if weights.len() != expected {
        return Err(XrayFitError::WrongWeightCount {
            expected,
            found: weights.len(),
        });
    }
    match weights.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
        Some(&w) => Err(XrayFitError::NonPositiveWeight(w)),
        None => Ok(()),
    }
}

/// Fitting windows per scan number. Built before the search, read-only during it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanBounds(BTreeMap<u32, RegionSet>);

impl ScanBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scan_number: u32, regions: RegionSet) {
        self.0.insert(scan_number, regions);
    }

    pub fn get(&self, scan_number: u32) -> Option<&RegionSet> {
        self.0.get(&scan_number)
    }

    pub fn contains(&self, scan_number: u32) -> bool {
        self.0.contains_key(&scan_number)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &RegionSet)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    /// Validated construction from parallel per-scan lists. Weights default to 1.
    ///
    /// Reflectivity windows are momentum transfers and must lie in `[0, 1]`; energy windows are
    /// photon energies and must be at least 1 eV.
    pub fn from_raw(
        records: &[ScanRecord],
        scans: &[u32],
        regions: &[Vec<(f64, f64)>],
        weights: Option<&[Vec<f64>]>,
    ) -> XfResult<Self> {
        if scans.len() != regions.len() {
            return Err(XrayFitError::MismatchedLengths(format!(
                "{} scans but {} boundary lists",
                scans.len(),
                regions.len()
            )));
        }
        if let Some(w) = weights {
            if w.len() != scans.len() {
                return Err(XrayFitError::MismatchedLengths(format!(
                    "{} scans but {} weight lists",
                    scans.len(),
                    w.len()
                )));
            }
        }

        let mut out = ScanBounds::new();
        for (i, (&scan, bounds)) in scans.iter().zip(regions).enumerate() {
            let record = records
                .iter()
                .find(|r| r.scan_number == scan)
                .ok_or(XrayFitError::OutOfRangeScan(scan))?;
            if out.contains(scan) {
                return Err(XrayFitError::AlreadySelectedScan(scan));
            }

            let scan_weights = match weights {
                Some(w) => {
                    if w[i].len() != bounds.len() {
                        return Err(XrayFitError::MismatchedLengths(format!(
                            "scan {} has {} boundaries but {} weights",
                            scan,
                            bounds.len(),
                            w[i].len()
                        )));
                    }
                    w[i].clone()
                }
                None => vec![1.0; bounds.len()],
            };

            for &(lower, upper) in bounds {
                check_domain(record, lower, upper)?;
            }

            let set = RegionSet::new(
                bounds.iter().map(|&(l, u)| Region::new(l, u)).collect(),
                scan_weights,
            )?;
            out.insert(scan, set);
        }
        Ok(out)
    }
}

pub fn check_domain(record: &ScanRecord, lower: f64, upper: f64) -> XfResult<()> {
    let (ok, allowed) = match record.scan_type {
        ScanType::Reflectivity => (
            (0.0..=1.0).contains(&lower) && (0.0..=1.0).contains(&upper),
            "[0, 1]",
        ),
        ScanType::Energy => (lower >= 1.0 && upper >= 1.0, ">= 1"),
    };
    if ok {
        Ok(())
    } else {
        Err(XrayFitError::DomainRangeViolation {
            scan: record.scan_number,
            kind: record.scan_type.to_string(),
            lower,
            upper,
            allowed,
        })
    }
}

/// Search interval of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBound {
    pub lower: f64,
    pub upper: f64,
}

impl ParameterBound {
    pub fn new(lower: f64, upper: f64) -> XfResult<Self> {
        let bound = Self { lower, upper };
        bound.check()?;
        Ok(bound)
    }

    pub fn check(&self) -> XfResult<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower > self.upper {
            return Err(XrayFitError::Validation(format!(
                "parameter bound ({}, {}) needs finite values with lower <= upper",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    #[inline]
    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.lower, self.upper)
    }
}
