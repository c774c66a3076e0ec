use super::tables;
use crate::error::XfResult;
use crate::plan::ScanSelection;
use crate::sample::Sample;
use crate::scan::{Dataset, ScanData, ScanRecord};
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Cancellation flag a render worker can block on.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<(Mutex<bool>, Condvar)>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cv) = &*self.0;
        if let Ok(mut f) = flag.lock() {
            *f = true;
        }
        cv.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0 .0.lock().map(|f| *f).unwrap_or(true)
    }

    /// Blocks until cancelled or `timeout` passes; true when cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cv) = &*self.0;
        let Ok(guard) = flag.lock() else {
            return true;
        };
        match cv.wait_timeout_while(guard, timeout, |cancelled| !*cancelled) {
            Ok((g, _)) => *g,
            Err(_) => true,
        }
    }

    pub fn wait(&self) {
        let (flag, cv) = &*self.0;
        if let Ok(guard) = flag.lock() {
            drop(cv.wait_while(guard, |cancelled| !*cancelled));
        }
    }
}

/// Data handed to a render worker; the worker owns its copy.
#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    pub title: String,
    pub scans: Vec<ScanRecord>,
    pub measured: BTreeMap<String, ScanData>,
    pub simulated: BTreeMap<String, ScanData>,
    /// Layers to show next to the curves.
    pub sample: Option<Sample>,
}

impl PreviewRequest {
    pub fn for_scan(dataset: &Dataset, record: &ScanRecord) -> Self {
        let pick = |m: &BTreeMap<String, ScanData>| {
            m.get(&record.name)
                .map(|d| BTreeMap::from([(record.name.clone(), d.clone())]))
                .unwrap_or_default()
        };
        Self {
            title: format!("Scan {}: {}", record.scan_number, record.name),
            scans: vec![record.clone()],
            measured: pick(&dataset.measured),
            simulated: pick(&dataset.simulated),
            sample: None,
        }
    }

    /// The chosen scans with their curves, plus the layers of `sample`.
    pub fn for_selection(dataset: &Dataset, selection: &ScanSelection, sample: &Sample) -> Self {
        let scans: Vec<ScanRecord> = selection
            .scans
            .iter()
            .filter_map(|&n| dataset.record(n).ok().cloned())
            .collect();
        let pick = |m: &BTreeMap<String, ScanData>| {
            scans
                .iter()
                .filter_map(|r| m.get(&r.name).map(|d| (r.name.clone(), d.clone())))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            title: "Selected scans".into(),
            measured: pick(&dataset.measured),
            simulated: pick(&dataset.simulated),
            sample: Some(sample.clone()),
            scans,
        }
    }

    /// Every scan of the dataset, without curve data.
    pub fn overview(dataset: &Dataset) -> Self {
        Self {
            title: "Scans".into(),
            scans: dataset.records.clone(),
            ..Default::default()
        }
    }
}

/// Draws a preview and keeps it up until `token` is cancelled.
pub trait PreviewRenderer: Send + Sync {
    fn render(&self, request: &PreviewRequest, token: &CancelToken);
}

/// Running preview. Cancelled and joined on `cancel()` or drop.
pub struct PreviewTask {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl PreviewTask {
    pub fn start(renderer: Arc<dyn PreviewRenderer>, request: PreviewRequest) -> XfResult<Self> {
        let token = CancelToken::new();
        let worker_token = token.clone();
        debug!("Starting preview '{}'", request.title);
        let handle = thread::Builder::new()
            .name("preview".into())
            .spawn(move || renderer.render(&request, &worker_token))?;
        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    fn stop(&mut self) {
        self.token.cancel();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for PreviewTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Prints the request as tables on stderr, then idles until cancelled.
///
/// Requests without curves list their scans; the others get point counts and axis ranges.
pub struct TableRenderer;

impl PreviewRenderer for TableRenderer {
    fn render(&self, request: &PreviewRequest, token: &CancelToken) {
        if request.measured.is_empty() {
            eprintln!("\n{}\n{}", request.title, tables::record_table(&request.scans));
        } else {
            eprintln!("\n{}\n{}", request.title, tables::preview_table(request));
        }
        if let Some(sample) = &request.sample {
            eprintln!("{}", tables::layer_table(sample));
        }
        token.wait();
    }
}

/// Renders nothing; used when previews are switched off.
pub struct NullRenderer;

impl PreviewRenderer for NullRenderer {
    fn render(&self, _request: &PreviewRequest, token: &CancelToken) {
        token.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct Counting {
        live: AtomicUsize,
    }

    impl PreviewRenderer for Counting {
        fn render(&self, _r: &PreviewRequest, token: &CancelToken) {
            self.live.fetch_add(1, Ordering::SeqCst);
            token.wait();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancel_stops_the_worker() {
        let renderer = Arc::new(Counting::default());
        let task = PreviewTask::start(renderer.clone(), PreviewRequest::default()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while renderer.live.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(renderer.live.load(Ordering::SeqCst), 1);
        task.cancel();
        assert_eq!(renderer.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_the_handle_cancels() {
        let renderer = Arc::new(Counting::default());
        {
            let _task = PreviewTask::start(renderer.clone(), PreviewRequest::default()).unwrap();
        }
        assert_eq!(renderer.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn selection_request_carries_the_chosen_curves_and_layers() {
        use crate::bounds::ScanBounds;
        use crate::sample::Layer;

        let record = |n: u32, name: &str| ScanRecord {
            scan_number: n,
            scan_type: crate::scan::ScanType::Reflectivity,
            name: name.into(),
            polarization: crate::scan::Polarization::S,
            energy: Some(600.0),
            angle: None,
        };
        let curve = ScanData {
            qz: vec![0.1, 0.2],
            theta: vec![1.0, 2.0],
            reflectivity: vec![0.5, 0.25],
            energy: vec![600.0, 600.0],
        };
        let dataset = Dataset {
            records: vec![record(1, "a"), record(2, "b")],
            measured: BTreeMap::from([("a".into(), curve.clone()), ("b".into(), curve)]),
            simulated: BTreeMap::new(),
        };
        let mut sample = Sample::default();
        sample.layers.push(Layer::default());
        let selection = ScanSelection {
            scans: vec![2, 7],
            scan_bounds: ScanBounds::new(),
        };

        let request = PreviewRequest::for_selection(&dataset, &selection, &sample);
        assert_eq!(request.scans.len(), 1);
        assert_eq!(request.scans[0].name, "b");
        assert!(request.measured.contains_key("b"));
        assert!(!request.measured.contains_key("a"));
        assert_eq!(request.sample.map(|s| s.layers.len()), Some(1));
    }

    #[test]
    fn wait_timeout_reports_cancellation() {
        let token = CancelToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(10)));
        token.cancel();
        assert!(token.wait_timeout(Duration::from_millis(10)));
        assert!(token.is_cancelled());
    }
}
