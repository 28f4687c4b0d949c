//! Load progress reporting for the CLI.
//!
//! Turns [`DictionaryEvent`]s into lines on **stderr** so stdout stays
//! parseable for scripts. Three modes: human-readable, one JSON object per
//! line, or nothing.

use std::future::Future;
use std::io::Write;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::events::DictionaryEvent;

/// Receives manager events as they happen.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &DictionaryEvent);
}

/// Human-friendly progress on stderr: "dictionary  validated   50%".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: &DictionaryEvent) {
        let line = match event {
            DictionaryEvent::LoadingStarted { source } => {
                format!("dictionary  loading from {}\n", source)
            }
            DictionaryEvent::LoadingProgress { stage, progress } => {
                format!("dictionary  {:<12} {:>3}%\n", stage.as_str(), progress)
            }
            DictionaryEvent::LoadingCompleted { words } => {
                format!("dictionary  loaded {} words\n", format_number(*words as u64))
            }
            DictionaryEvent::CacheLoaded { words } => {
                format!(
                    "dictionary  loaded {} words from cache\n",
                    format_number(*words as u64)
                )
            }
            DictionaryEvent::LoadingFailed { error } => {
                format!("dictionary  failed ({}): {}\n", error.kind, error.message)
            }
            DictionaryEvent::CacheCleared => "dictionary  cache cleared\n".to_string(),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: &DictionaryEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: &DictionaryEvent) {}
}

/// Run `fut` while forwarding events from `rx` to `reporter`.
///
/// Events still queued when `fut` completes are flushed before returning.
pub async fn drive<T, F>(
    mut rx: broadcast::Receiver<DictionaryEvent>,
    reporter: &dyn ProgressReporter,
    fut: F,
) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => {
                loop {
                    match rx.try_recv() {
                        Ok(event) => reporter.report(&event),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                return out;
            }
            event = rx.recv() => match event {
                Ok(event) => reporter.report(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress reporter fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    fut.await
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!(
                "unknown progress mode '{}', expected off, human, or json",
                other
            ),
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
