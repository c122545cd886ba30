//! Player-facing sink for things the simulation wants shown but does not draw

use parking_lot::Mutex;

use crate::game::arcade::SessionResults;

pub trait DisplayLayer: Send + Sync {
    /// Surface a recoverable failure once
    fn notify_error(&self, message: &str);

    /// A quest was triggered and waits for accept/decline
    fn present_quest_prompt(&self, _quest_name: &str) {}

    /// An arcade session finished
    fn show_session_results(&self, _results: &SessionResults) {}
}

/// Logs everything through tracing
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl DisplayLayer for TracingDisplay {
    fn notify_error(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn present_quest_prompt(&self, quest_name: &str) {
        tracing::info!("Quest available: {} (accept or decline)", quest_name);
    }

    fn show_session_results(&self, results: &SessionResults) {
        tracing::info!(
            "Arcade over ({:?}): score {}, {} eliminations, max combo {}, survived {:.1}s",
            results.reason,
            results.score,
            results.eliminations,
            results.max_combo,
            results.survival_time
        );
    }
}

/// Keeps everything it is shown, for inspection
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    errors: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    results: Mutex<Vec<SessionResults>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn results(&self) -> Vec<SessionResults> {
        self.results.lock().clone()
    }
}

impl DisplayLayer for RecordingDisplay {
    fn notify_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn present_quest_prompt(&self, quest_name: &str) {
        self.prompts.lock().push(quest_name.to_string());
    }

    fn show_session_results(&self, results: &SessionResults) {
        self.results.lock().push(results.clone());
    }
}
