//! # Scan Slot
//!
//! Process-wide single-active-scan state machine. A scan claims the
//! slot with [`ScanProgress::begin`] and holds it through the returned
//! [`ScanGuard`]; any number of readers poll [`ScanProgress::snapshot`]
//! without blocking the writer. A second `begin` while the slot is
//! taken is rejected with the running scan's snapshot attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use plugscout_common::error::HubError;
use plugscout_common::scan::{ScanKind, ScanSnapshot};

/// Percent reserved for setup before the sweep starts.
const SWEEP_BASE_PERCENT: u8 = 15;
/// Percent the sweep itself spans; the rest is finalization.
const SWEEP_SPAN_PERCENT: u8 = 75;

#[derive(Debug, Default)]
struct State {
    active: bool,
    kind: Option<ScanKind>,
    label: String,
    percent: u8,
    step: String,
    scanned: usize,
    total: usize,
    found: usize,
    started_at: Option<SystemTime>,
    started_instant: Option<Instant>,
    elapsed: Duration,
    eta: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    cancel: AtomicBool,
}

/// Handle to the scan slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    inner: Arc<Inner>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot. Fails with the running scan's snapshot when it
    /// is already taken.
    pub fn begin(
        &self,
        kind: ScanKind,
        label: impl Into<String>,
        total: usize,
    ) -> Result<ScanGuard, HubError> {
        let mut state = self.lock();
        if state.active {
            return Err(HubError::ScanActive(Box::new(snapshot_of(
                &state,
                self.inner.cancel.load(Ordering::SeqCst),
            ))));
        }
        *state = State {
            active: true,
            kind: Some(kind),
            label: label.into(),
            percent: 0,
            step: "Preparing scan".to_string(),
            scanned: 0,
            total,
            found: 0,
            started_at: Some(SystemTime::now()),
            started_instant: Some(Instant::now()),
            elapsed: Duration::ZERO,
            eta: None,
        };
        self.inner.cancel.store(false, Ordering::SeqCst);
        Ok(ScanGuard {
            progress: self.clone(),
            finished: false,
        })
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        let state = self.lock();
        snapshot_of(&state, self.inner.cancel.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Ask the running scan to stop. Idempotent while a scan runs;
    /// fails when the slot is idle.
    pub fn request_cancel(&self) -> Result<(), HubError> {
        let state = self.lock();
        if !state.active {
            return Err(HubError::NoScanRunning);
        }
        self.inner.cancel.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn cancel_requested(&self) -> bool {
        self.inner.cancel.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic mid-update leaves only display fields behind.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn snapshot_of(state: &State, cancel: bool) -> ScanSnapshot {
    // A slot that never ran has nothing to report yet; a finished one
    // keeps showing its last scan.
    if !state.active && state.started_at.is_none() {
        return ScanSnapshot::idle();
    }
    let elapsed = match (state.active, state.started_instant) {
        (true, Some(started)) => started.elapsed(),
        _ => state.elapsed,
    };
    ScanSnapshot {
        active: state.active,
        kind: state.kind,
        label: state.label.clone(),
        percent: state.percent,
        step: state.step.clone(),
        scanned: state.scanned,
        total: state.total,
        found: state.found,
        elapsed,
        eta: state.eta,
        cancel_requested: state.active && cancel,
        can_cancel: state.active && !cancel,
        started_at: state.started_at,
    }
}

/// Writer half of the slot, owned by the running scan. Dropping the
/// guard without finishing returns the slot to idle so a crashed scan
/// cannot wedge the engine.
#[derive(Debug)]
pub struct ScanGuard {
    progress: ScanProgress,
    finished: bool,
}

impl ScanGuard {
    pub fn set_step(&self, step: impl Into<String>) {
        self.progress.lock().step = step.into();
    }

    pub fn set_label(&self, label: impl Into<String>) {
        self.progress.lock().label = label.into();
    }

    pub fn set_total(&self, total: usize) {
        self.progress.lock().total = total;
    }

    /// Move the bar forward. Never moves backward and saturates at 99;
    /// only [`finish`](Self::finish) reaches 100.
    pub fn set_percent(&self, percent: u8) {
        let mut state = self.progress.lock();
        state.percent = state.percent.max(percent.min(99));
    }

    /// Record one finished probe and recompute percent and the rolling
    /// remaining-time estimate.
    pub fn probe_done(&self, found: bool) {
        let mut state = self.progress.lock();
        state.scanned += 1;
        if found {
            state.found += 1;
        }
        if state.total > 0 {
            let fraction = state.scanned as f64 / state.total as f64;
            let swept = (f64::from(SWEEP_SPAN_PERCENT) * fraction) as u8;
            let percent = (SWEEP_BASE_PERCENT + swept).min(SWEEP_BASE_PERCENT + SWEEP_SPAN_PERCENT);
            state.percent = state.percent.max(percent);

            if let Some(started) = state.started_instant {
                let per_probe = started.elapsed().div_f64(state.scanned as f64);
                let remaining = state.total.saturating_sub(state.scanned) as u32;
                state.eta = Some(per_probe * remaining);
            }
        }
    }

    pub fn cancel_requested(&self) -> bool {
        self.progress.cancel_requested()
    }

    pub fn found(&self) -> usize {
        self.progress.lock().found
    }

    /// Complete the scan and release the slot. Percent reaches 100
    /// through this path only.
    pub fn finish(mut self, step: impl Into<String>) {
        let mut state = self.progress.lock();
        state.percent = 100;
        finalize(&mut state, step.into());
        drop(state);
        self.finished = true;
    }

    /// Release the slot without claiming completion; percent stays
    /// where it was.
    pub fn abort(mut self, step: impl Into<String>) {
        let mut state = self.progress.lock();
        finalize(&mut state, step.into());
        drop(state);
        self.finished = true;
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.progress.lock();
        if state.active {
            finalize(&mut state, "Scan ended unexpectedly".to_string());
        }
    }
}

fn finalize(state: &mut State, step: String) {
    state.active = false;
    state.step = step;
    if let Some(started) = state.started_instant.take() {
        state.elapsed = started.elapsed();
    }
    state.eta = None;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
