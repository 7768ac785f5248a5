//! Recording of agent interactions.
//!
//! A [`Tracer`] owns the [`Exchange`] for one task. Messages are
//! appended as the task progresses and `finalize` persists the whole
//! exchange as one line of `{trace_dir}/{task_id}.jsonl`. Calling
//! `finalize` more than once appends more snapshot lines to the same
//! file; readers treat the last line as current state.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info};

use crate::error::Error;
use crate::protocol::{Exchange, Message};

/// Recorder for a single task exchange.
pub struct Tracer {
    trace_dir: PathBuf,
    start: Instant,
    exchange: Exchange,
}

impl Tracer {
    /// Create a tracer for `task_id`, writing trace files under `trace_dir`.
    ///
    /// Fails only when `task_id` is empty.
    pub fn new(task_id: &str, trace_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        if task_id.is_empty() {
            return Err(Error::EmptyTaskId);
        }
        Ok(Self {
            trace_dir: trace_dir.into(),
            start: Instant::now(),
            exchange: Exchange::new(task_id),
        })
    }

    /// Append a message to the current exchange. In-memory only.
    pub fn log(&mut self, msg: Message) {
        self.exchange.messages.push(msg);
    }

    /// Read access for callers that want to inspect the recorded state.
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Finalize the current exchange and persist it.
    ///
    /// Stamps latency on the first call, accumulates token usage, sets
    /// the verdict when one is given and appends the exchange as a
    /// single JSON line. Persistence is best-effort: I/O failures are
    /// logged and swallowed so a task can complete even when its trace
    /// cannot be written.
    pub fn finalize(&mut self, verdict: Option<&str>, prompt_tokens: u64, output_tokens: u64) {
        if self.exchange.latency_ms.is_none() {
            self.exchange.latency_ms = Some(self.start.elapsed().as_millis() as u64);
        }
        self.exchange.cost_tokens_prompt += prompt_tokens;
        self.exchange.cost_tokens_output += output_tokens;
        if let Some(v) = verdict {
            self.exchange.verdict = Some(v.to_string());
        }

        let path = self.trace_dir.join(format!("{}.jsonl", self.exchange.task_id));
        if let Err(e) = self.append_line(&path) {
            error!("Failed to write trace file '{}': {e}", path.display());
        } else {
            info!("Trace saved to {}", path.display());
        }
    }

    /// One open-append-write-close cycle: the whole record goes out as
    /// one line so concurrent appends to the same file never interleave
    /// partial lines.
    fn append_line(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.trace_dir)?;
        let line = serde_json::to_string(&self.exchange)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
