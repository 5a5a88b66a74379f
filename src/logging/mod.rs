//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, LogFormat, StepEntry, StepStatus};

/// A [`Log`] implementation that collects messages in memory (tests only).
#[cfg(test)]
pub(crate) mod test_log {
    use super::types::{Log, StepEntry, StepStatus};
    use std::sync::Mutex;

    /// Collects every logged line, tagged with its level.
    #[derive(Debug, Default)]
    pub struct CollectingLog {
        pub lines: Mutex<Vec<(String, String)>>,
        pub steps: Mutex<Vec<StepEntry>>,
    }

    impl CollectingLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines_of(&self, level: &str) -> Vec<String> {
            self.lines
                .lock()
                .map(|guard| {
                    guard
                        .iter()
                        .filter(|(l, _)| l == level)
                        .map(|(_, m)| m.clone())
                        .collect()
                })
                .unwrap_or_default()
        }

        fn push(&self, level: &str, msg: &str) {
            if let Ok(mut guard) = self.lines.lock() {
                guard.push((level.to_string(), msg.to_string()));
            }
        }
    }

    impl Log for CollectingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }

        fn info(&self, msg: &str) {
            self.push("info", msg);
        }

        fn success(&self, msg: &str) {
            self.push("success", msg);
        }

        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }

        fn error(&self, msg: &str) {
            self.push("error", msg);
        }

        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }

        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }

        fn progress(&self, msg: &str) {
            self.push("progress", msg);
        }

        fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
            if let Ok(mut guard) = self.steps.lock() {
                guard.push(StepEntry {
                    name: name.to_string(),
                    status,
                    message: message.map(String::from),
                });
            }
        }
    }
}
