pub mod loader;

use crate::error::{XfResult, XrayFitError};
use crate::sample::Sample;
use crate::scan::{Dataset, ScanData};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Source of the sample and scan data of one fit session.
pub trait SampleStore {
    type Handle: StoreHandle;

    /// Opens the store for one session. The handle is released when dropped.
    fn open(&self) -> XfResult<Self::Handle>;
}

pub trait StoreHandle {
    fn load_sample(&self) -> XfResult<Sample>;
    fn load_datasets(&self) -> XfResult<Dataset>;
}

/// Directory layout:
///
/// ```text
/// <root>/sample.json
/// <root>/scans.csv
/// <root>/measured/<scan name>.csv
/// <root>/simulated/<scan name>.csv
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    open_handles: Arc<AtomicUsize>,
}

pub const SAMPLE_FILE: &str = "sample.json";
pub const SCAN_INDEX_FILE: &str = "scans.csv";
pub const MEASURED_DIR: &str = "measured";
pub const SIMULATED_DIR: &str = "simulated";

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handles currently open on this store.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Writes a complete store; used to seed fixtures and by tooling.
    pub fn save(&self, sample: &Sample, dataset: &Dataset) -> XfResult<()> {
        fs::create_dir_all(self.root.join(MEASURED_DIR))?;
        fs::create_dir_all(self.root.join(SIMULATED_DIR))?;

        fs::write(
            self.root.join(SAMPLE_FILE),
            serde_json::to_string_pretty(sample)?,
        )?;
        loader::write_scan_index(File::create(self.root.join(SCAN_INDEX_FILE))?, &dataset.records)?;

        for (name, data) in &dataset.measured {
            loader::write_scan_data(File::create(scan_path(&self.root, MEASURED_DIR, name))?, data)?;
        }
        for (name, data) in &dataset.simulated {
            loader::write_scan_data(File::create(scan_path(&self.root, SIMULATED_DIR, name))?, data)?;
        }
        Ok(())
    }
}

fn scan_path(root: &Path, dir: &str, name: &str) -> PathBuf {
    root.join(dir).join(format!("{}.csv", name))
}

impl SampleStore for DirectoryStore {
    type Handle = DirectoryHandle;

    fn open(&self) -> XfResult<DirectoryHandle> {
        if !self.root.join(SCAN_INDEX_FILE).is_file() {
            return Err(XrayFitError::Config(format!(
                "'{}' is not a sample store (missing {})",
                self.root.display(),
                SCAN_INDEX_FILE
            )));
        }
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        info!("Opened sample store {}", self.root.display());
        Ok(DirectoryHandle {
            root: self.root.clone(),
            open_handles: self.open_handles.clone(),
        })
    }
}

pub struct DirectoryHandle {
    root: PathBuf,
    open_handles: Arc<AtomicUsize>,
}

impl StoreHandle for DirectoryHandle {
    fn load_sample(&self) -> XfResult<Sample> {
        Sample::load_from_file(self.root.join(SAMPLE_FILE))
    }

    fn load_datasets(&self) -> XfResult<Dataset> {
        let records = loader::load_scan_index(self.root.join(SCAN_INDEX_FILE))?;
        let mut dataset = Dataset {
            records,
            ..Default::default()
        };

        for record in &dataset.records {
            let measured = scan_path(&self.root, MEASURED_DIR, &record.name);
            let data: ScanData = loader::load_scan_data(&measured)?;
            data.check_shape(&record.name, record.scan_type)?;
            dataset.measured.insert(record.name.clone(), data);

            // Simulations are optional; previews and the replay simulator skip missing ones
            let simulated = scan_path(&self.root, SIMULATED_DIR, &record.name);
            if simulated.is_file() {
                dataset
                    .simulated
                    .insert(record.name.clone(), loader::load_scan_data(&simulated)?);
            }
        }

        debug!(
            "Loaded {} scans ({} with simulations)",
            dataset.records.len(),
            dataset.simulated.len()
        );
        Ok(dataset)
    }
}

impl Drop for DirectoryHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
        info!("Closed sample store {}", self.root.display());
    }
}
