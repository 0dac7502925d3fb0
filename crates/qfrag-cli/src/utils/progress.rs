use indicatif::{ProgressBar, ProgressStyle};
use qfrag::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// Bridges the engine's [`Progress`] events onto an indicatif progress bar.
///
/// Pipeline phases render as a spinner with the phase name; per-cluster and
/// per-fragment tasks switch the bar into counted mode.
#[derive(Clone)]
pub struct ProgressBridge {
    bar: Arc<Mutex<ProgressBar>>,
}

impl ProgressBridge {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Starting...");
        bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        bar.disable_steady_tick();
        bar.finish_and_clear();

        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();

        Box::new(move |progress: Progress| {
            let Ok(bar) = bar.lock() else {
                warn!("Progress bar mutex was poisoned; dropping progress event.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(Self::spinner_style());
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    bar.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    bar.disable_steady_tick();
                    bar.finish_with_message("done");
                }
                Progress::TaskStart { total_steps } => {
                    bar.disable_steady_tick();
                    bar.reset();
                    bar.set_length(total_steps);
                    bar.set_position(0);
                    bar.set_style(Self::bar_style());
                }
                Progress::TaskIncrement => {
                    bar.inc(1);
                }
                Progress::TaskFinish => {
                    if bar.position() < bar.length().unwrap_or(0) {
                        bar.set_position(bar.length().unwrap_or(0));
                    }
                    bar.finish();
                }
                Progress::Message(msg) => {
                    if bar.is_finished() {
                        bar.set_message(msg);
                    } else {
                        bar.println(format!("  {}", msg));
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<16} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("Failed to create bar style template")
            .progress_chars("=>-")
    }
}

impl Default for ProgressBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qfrag::engine::progress::Progress;

    #[test]
    fn bridge_initializes_in_a_clean_state() {
        let bridge = ProgressBridge::new();
        let bar = bridge.bar.lock().unwrap();
        assert_eq!(bar.length(), Some(0));
        assert!(bar.is_finished());
    }

    #[test]
    fn callback_drives_the_bar_through_a_task() {
        let bridge = ProgressBridge::new();
        let callback = bridge.callback();

        callback(Progress::PhaseStart {
            name: "Clustering",
        });
        {
            let bar = bridge.bar.lock().unwrap();
            assert_eq!(bar.message(), "Clustering");
            assert!(!bar.is_finished());
        }

        callback(Progress::TaskStart { total_steps: 4 });
        callback(Progress::TaskIncrement);
        {
            let bar = bridge.bar.lock().unwrap();
            assert_eq!(bar.length(), Some(4));
            assert_eq!(bar.position(), 1);
        }

        callback(Progress::TaskFinish);
        callback(Progress::PhaseFinish);
        {
            let bar = bridge.bar.lock().unwrap();
            assert!(bar.is_finished());
            assert_eq!(bar.message(), "done");
        }
    }

    #[test]
    fn callback_is_send_across_threads() {
        let bridge = ProgressBridge::new();
        let callback = bridge.callback();

        std::thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Growth" });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let bar = bridge.bar.lock().unwrap();
        assert!(bar.is_finished());
    }
}
