use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use surge::WorkItem;
use tokio::sync::watch;

/// Shared execution log for [`RecordingItem`] and [`SleepItem`].
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// Create an empty shared execution log.
pub fn shared_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Item that appends its name to a shared log and returns immediately.
pub struct RecordingItem {
    name: String,
    log: ExecutionLog,
}

impl RecordingItem {
    /// Create a recording item writing into `log`.
    pub fn new(name: impl Into<String>, log: &ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl WorkItem for RecordingItem {
    async fn run(&self) -> anyhow::Result<()> {
        self.log.lock().push(self.name.clone());
        Ok(())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Item that sleeps for a fixed duration, then records its name.
pub struct SleepItem {
    name: String,
    duration_ms: u64,
    log: ExecutionLog,
}

impl SleepItem {
    /// Create a sleeping item writing into `log` once done.
    pub fn new(
        name: impl Into<String>,
        duration_ms: u64,
        log: &ExecutionLog,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            duration_ms,
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl WorkItem for SleepItem {
    async fn run(&self) -> anyhow::Result<()> {
        tokio::time::sleep(tokio::time::Duration::from_millis(
            self.duration_ms,
        ))
        .await;
        self.log.lock().push(self.name.clone());
        Ok(())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Item that fails its first `fail_first` attempts, then succeeds.
///
/// Counts attempts so tests can assert how often a policy re-ran it.
pub struct FailingItem {
    name: String,
    fail_first: u32,
    attempts: AtomicU32,
}

impl FailingItem {
    /// Create an item failing the first `fail_first` attempts.
    pub fn new(name: impl Into<String>, fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fail_first,
            attempts: AtomicU32::new(0),
        })
    }

    /// Create an item that fails every attempt.
    pub fn always(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, u32::MAX)
    }

    /// Number of times the item has been run so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkItem for FailingItem {
    async fn run(&self) -> anyhow::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            anyhow::bail!("{} failed on attempt {attempt}", self.name);
        }
        Ok(())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Controller for a batch of [`GateItem`]s.
///
/// Each item signals that it has started and then blocks until the gate is
/// opened, letting tests observe exactly how many items are concurrently
/// active under an admission limit.
pub struct Gate {
    started: Arc<AtomicUsize>,
    release: watch::Sender<bool>,
}

impl Gate {
    /// Create a closed gate.
    pub fn new() -> Self {
        let (release, _) = watch::channel(false);
        Self {
            started: Arc::new(AtomicUsize::new(0)),
            release,
        }
    }

    /// Create an item that blocks on this gate.
    pub fn item(&self, name: impl Into<String>) -> Arc<GateItem> {
        Arc::new(GateItem {
            name: name.into(),
            started: Arc::clone(&self.started),
            release: self.release.subscribe(),
        })
    }

    /// How many gated items have started executing.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Open the gate, letting every blocked item finish.
    pub fn open(&self) {
        let _ = self.release.send(true);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Item that marks itself started, then blocks until its [`Gate`] opens.
pub struct GateItem {
    name: String,
    started: Arc<AtomicUsize>,
    release: watch::Receiver<bool>,
}

#[async_trait]
impl WorkItem for GateItem {
    async fn run(&self) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let mut release = self.release.clone();
        release
            .wait_for(|open| *open)
            .await
            .map_err(|_| anyhow::anyhow!("gate controller dropped"))?;
        Ok(())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
