/// Progress events emitted by the fragmentation pipeline.
///
/// Phases bracket the pipeline stages (clustering, growth, reconciliation,
/// finalization); tasks bracket per-cluster or per-fragment work within a
/// phase, with a known step count for progress bars.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// A cheap, optional observer for pipeline progress.
///
/// The default reporter discards all events, so library callers only pay for
/// progress handling when they install a callback.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn default_reporter_discards_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::PhaseStart { name: "Clustering" });
        reporter.report(Progress::PhaseFinish);
    }

    #[test]
    fn callback_receives_events_in_order() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(format!("{event:?}"));
        }));
        reporter.report(Progress::TaskStart { total_steps: 2 });
        reporter.report(Progress::TaskIncrement);
        reporter.report(Progress::TaskFinish);
        drop(reporter);

        let seen = events.into_inner().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].contains("TaskStart"));
        assert!(seen[2].contains("TaskFinish"));
    }
}
