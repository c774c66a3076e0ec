use crate::bounds::{check_regions, check_weights, Region};
use crate::error::{XfResult, XrayFitError};

pub fn parse_number(input: &str) -> XfResult<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| XrayFitError::InvalidSelection(input.trim().to_string()))
}

/// Scan number that exists in `known` and is not yet in `taken`.
pub fn parse_scan_number(input: &str, known: &[u32], taken: &[u32]) -> XfResult<u32> {
    let n = input
        .trim()
        .parse::<u32>()
        .map_err(|_| XrayFitError::InvalidSelection(input.trim().to_string()))?;
    if !known.contains(&n) {
        return Err(XrayFitError::OutOfRangeScan(n));
    }
    if taken.contains(&n) {
        return Err(XrayFitError::AlreadySelectedScan(n));
    }
    Ok(n)
}

/// Space-separated `(lower,upper)` tokens, e.g. `(0.01,0.1) (0.12,0.3)`.
///
/// Whitespace inside the parentheses is tolerated. The result is checked for order and overlap.
pub fn parse_regions(input: &str) -> XfResult<Vec<Region>> {
    let mut regions = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let malformed = || XrayFitError::MalformedBoundary(rest.to_string());
        let body = rest.strip_prefix('(').ok_or_else(malformed)?;
        let close = body.find(')').ok_or_else(malformed)?;

        let mut parts = body[..close].split(',');
        let (Some(lower), Some(upper), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let lower = lower.trim().parse::<f64>().map_err(|_| malformed())?;
        let upper = upper.trim().parse::<f64>().map_err(|_| malformed())?;
        regions.push(Region::new(lower, upper));

        rest = body[close + 1..].trim_start();
    }

    check_regions(&regions)?;
    Ok(regions)
}

/// One positive weight per region, separated by spaces or commas.
pub fn parse_weights(input: &str, expected: usize) -> XfResult<Vec<f64>> {
    let weights = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| XrayFitError::InvalidSelection(t.to_string()))
        })
        .collect::<XfResult<Vec<_>>>()?;
    check_weights(&weights, expected)?;
    Ok(weights)
}
