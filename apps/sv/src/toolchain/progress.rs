//! Progress reporting for downloads and extraction.
//!
//! A [`Progress`] is a cheap, cloneable handle over shared atomic counters.
//! Any number of writers add bytes to it concurrently, usually through a
//! [`ProgressWriter`] wrapped around the file being written. A single
//! [`ProgressReporter`] task samples the counter every 100 ms, keeps a
//! smoothed transfer rate, and redraws one status line on stderr.

use std::io::{IsTerminal, Write};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Renderer tick.
const TICK: Duration = Duration::from_millis(100);
const TICKS_PER_SECOND: u64 = 10;
const BAR_WIDTH: u64 = 30;

/// Lifecycle of a tracked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Done,
    Failed,
}

impl Status {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Done => 1,
            Self::Failed => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Done,
            2 => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[derive(Debug)]
struct State {
    label: String,
    current: AtomicU64,
    total: AtomicU64,
    rate: AtomicU64,
    status: AtomicU8,
}

/// Shared progress counters for one transfer.
#[derive(Debug, Clone)]
pub struct Progress {
    state: Arc<State>,
}

impl Progress {
    /// Creates a tracker. A `total` of zero means unknown.
    #[must_use]
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        Self {
            state: Arc::new(State {
                label: label.into(),
                current: AtomicU64::new(0),
                total: AtomicU64::new(total),
                rate: AtomicU64::new(0),
                status: AtomicU8::new(Status::Running.as_u8()),
            }),
        }
    }

    pub fn add(&self, bytes: u64) {
        self.state.current.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn set_total(&self, total: u64) {
        self.state.total.store(total, Ordering::Relaxed);
    }

    /// Zeroes the counters before a new attempt.
    pub fn reset(&self) {
        self.state.current.store(0, Ordering::Relaxed);
        self.state.rate.store(0, Ordering::Relaxed);
        self.set_status(Status::Running);
    }

    pub fn set_status(&self, status: Status) {
        self.state.status.store(status.as_u8(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.state.current.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.state.total.load(Ordering::Relaxed)
    }

    /// Smoothed rate in bytes per second.
    #[must_use]
    pub fn rate(&self) -> u64 {
        self.state.rate.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_u8(self.state.status.load(Ordering::Relaxed))
    }

    #[must_use = "returns the label without side effects"]
    pub fn label(&self) -> &str {
        &self.state.label
    }

    /// Completion percentage, or `None` when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| (self.current().min(total) as f64 / total as f64) * 100.0)
    }

    /// Wraps a writer so that every byte written is counted here.
    #[must_use]
    pub fn writer<W>(&self, inner: W) -> ProgressWriter<W> {
        ProgressWriter {
            inner,
            progress: self.clone(),
        }
    }

    fn record_sample(&self, bytes_per_second: u64) {
        let smoothed = smooth_rate(self.rate(), bytes_per_second);
        self.state.rate.store(smoothed, Ordering::Relaxed);
    }

    /// One status line, without a trailing newline.
    #[must_use]
    pub fn render_line(&self) -> String {
        let current = self.current();
        let total = self.total();
        let speed = format_speed(self.rate());
        let suffix = match self.status() {
            Status::Running => "",
            Status::Done => " done",
            Status::Failed => " failed",
        };
        if total == 0 {
            return format!("{} {} {speed}{suffix}", self.label(), format_bytes(current));
        }
        let filled = (current.min(total) * BAR_WIDTH / total) as usize;
        let width = BAR_WIDTH as usize;
        let bar = if filled >= width {
            "=".repeat(width)
        } else {
            format!("{}>{}", "=".repeat(filled), " ".repeat(width - filled - 1))
        };
        format!(
            "{} [{bar}] {:>5.1}% {}/{} {speed}{suffix}",
            self.label(),
            self.percent().unwrap_or(0.0),
            format_bytes(current),
            format_bytes(total)
        )
    }
}

/// Exponential moving average over per-tick samples.
fn smooth_rate(previous: u64, sample: u64) -> u64 {
    if previous == 0 {
        sample
    } else {
        (sample.saturating_mul(3) / 10).saturating_add(previous.saturating_mul(7) / 10)
    }
}

/// Writer decorator that mirrors written bytes into a [`Progress`].
#[derive(Debug)]
pub struct ProgressWriter<W> {
    inner: W,
    progress: Progress,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.progress.add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = poll {
            this.progress.add(written as u64);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Background renderer for a [`Progress`].
///
/// Dropping the reporter stops the render task without a final line.
#[derive(Debug)]
pub struct ProgressReporter {
    progress: Progress,
    visible: bool,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Starts rendering to stderr when it is a terminal.
    #[must_use]
    pub fn start(progress: Progress) -> Self {
        Self::start_with(progress, std::io::stderr().is_terminal())
    }

    /// Starts the sampling task; draws only when `visible`.
    #[must_use]
    pub fn start_with(progress: Progress, visible: bool) -> Self {
        let (stop, stopped) = oneshot::channel();
        let handle = tokio::spawn(render_loop(progress.clone(), stopped, visible));
        Self {
            progress,
            visible,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stops the render task and prints the final state.
    pub async fn finish(mut self, status: Status) {
        self.progress.set_status(status);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        if self.visible {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "\r{}", self.progress.render_line());
        }
    }
}

async fn render_loop(progress: Progress, mut stopped: oneshot::Receiver<()>, visible: bool) {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last = progress.current();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = progress.current();
                progress.record_sample(now.saturating_sub(last) * TICKS_PER_SECOND);
                last = now;
                if visible {
                    let mut stderr = std::io::stderr().lock();
                    let _ = write!(stderr, "\r{}", progress.render_line());
                    let _ = stderr.flush();
                }
            }
            _ = &mut stopped => break,
        }
    }
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a rate in bytes per second.
#[must_use]
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}
