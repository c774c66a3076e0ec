use thiserror::Error;

#[derive(Error, Debug)]
pub enum XrayFitError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Simulation Error: {0}")]
    Simulation(String),

    #[error("No scan data stored under '{0}'")]
    MissingScanData(String),

    // --- Interactive input (retried by the wizards) ---
    #[error("Invalid selection '{0}'")]
    InvalidSelection(String),

    #[error("Scan {0} does not exist")]
    OutOfRangeScan(u32),

    #[error("Scan {0} has already been selected")]
    AlreadySelectedScan(u32),

    #[error("Boundaries must be ascending and non-overlapping: {0}")]
    UnsortedBoundary(String),

    #[error("Malformed boundary '{0}', expected (lower,upper)")]
    MalformedBoundary(String),

    #[error("Weights must be positive, got {0}")]
    NonPositiveWeight(f64),

    #[error("Expected {expected} weights, got {found}")]
    WrongWeightCount { expected: usize, found: usize },

    // --- Fit setup ---
    #[error("Mismatched lengths: {0}")]
    MismatchedLengths(String),

    #[error("Scan {scan}: region ({lower}, {upper}) is outside the {allowed} range of a {kind} scan")]
    DomainRangeViolation {
        scan: u32,
        kind: String,
        lower: f64,
        upper: f64,
        allowed: &'static str,
    },

    #[error("Layer index {0} does not exist in the sample")]
    UnknownLayerIndex(usize),

    #[error("Layer {layer} has no element '{element}'")]
    UnknownElement { layer: usize, element: String },

    #[error("Element '{element}' in layer {layer} has no polymorph '{polymorph}'")]
    UnknownPolymorph {
        layer: usize,
        element: String,
        polymorph: String,
    },

    // --- Search ---
    #[error("Degenerate simulation: zero simulated value in scan {scan} at point {index}")]
    DegenerateSimulation { scan: u32, index: usize },

    #[error("No scans selected for optimization")]
    EmptyScanSet,

    #[error("Local search failed: {0}")]
    LocalSearch(String),
}

pub type XfResult<T> = Result<T, XrayFitError>;
