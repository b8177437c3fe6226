use crate::runner::{self, PathApplier};
use crate::tweaks::TweakDefinition;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one tweak within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweakOutcome {
    /// Every path succeeded.
    Applied,
    /// At least one path succeeded and at least one failed.
    Partial,
    /// No path succeeded.
    Failed,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No tweak failed.
    Success,
    /// Some tweaks failed but at least one applied cleanly.
    Partial,
    /// No tweak applied cleanly.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct TweakReport {
    pub name: String,
    pub outcome: TweakOutcome,
    pub paths_succeeded: usize,
    pub paths_failed: usize,
    pub failures: Vec<PathFailure>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Tweaks with every path applied.
    pub applied: usize,
    /// Tweaks that failed fully or partially.
    pub failed: usize,
    pub tweaks: Vec<TweakReport>,
    pub cancelled: bool,
    pub finished_at: String,
}

impl RunReport {
    pub fn summary(&self) -> String {
        match self.outcome {
            RunOutcome::Success => format!("All {} tweaks applied successfully!", self.applied),
            RunOutcome::Partial => {
                format!("{} tweaks applied, {} failed", self.applied, self.failed)
            }
            RunOutcome::Failed => "Failed to apply any tweaks".to_string(),
        }
    }
}

/// Progress stream emitted while a run is in flight. The UI drains these from
/// its poll loop; the CLI prints them as they arrive.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Log(String),
    /// Coarse progress for the status line: step index and text.
    Progress(u8, String),
    Finished(RunReport),
}

/// Serial batch orchestrator: one path at a time, one tweak at a time, short
/// fixed pauses in between for UI pacing. No retries, no rollback.
pub struct BatchRunner<'a> {
    applier: &'a dyn PathApplier,
    path_delay: Duration,
    tweak_delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(applier: &'a dyn PathApplier, cancel: Arc<AtomicBool>) -> Self {
        BatchRunner {
            applier,
            path_delay: Duration::from_millis(100),
            tweak_delay: Duration::from_millis(200),
            cancel,
        }
    }

    /// Removes the pacing delays, for scripted use and tests.
    pub fn without_delays(mut self) -> Self {
        self.path_delay = Duration::ZERO;
        self.tweak_delay = Duration::ZERO;
        self
    }

    /// Applies every tweak in order and reports the aggregated result. Events
    /// are best-effort: a dropped receiver never aborts the run.
    pub fn run(&self, tweaks: &[TweakDefinition], events: &Sender<BatchEvent>) -> RunReport {
        let log = |msg: String| {
            let _ = events.send(BatchEvent::Log(msg));
        };

        log(format!(
            "[*] Starting operation with {} enabled tweaks",
            tweaks.len()
        ));
        let _ = events.send(BatchEvent::Progress(
            2,
            format!("Applying {} tweaks...", tweaks.len()),
        ));

        let names: Vec<&str> = tweaks.iter().map(|t| t.name.as_str()).collect();
        log(format!("[+] Applying the selected tweaks: {}", names.join(", ")));
        for (i, tweak) in tweaks.iter().enumerate() {
            log(format!("[{}/{}] Tweak: {}", i + 1, tweaks.len(), tweak.name));
            for (j, path) in tweak.paths.iter().enumerate() {
                log(format!("      {}. {}", j + 1, path));
            }
        }
        log("[*] Beginning tweak application process...".to_string());

        let mut reports: Vec<TweakReport> = Vec::with_capacity(tweaks.len());
        let mut cancelled = false;

        'tweaks: for (index, tweak) in tweaks.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            log(format!(
                "[*] Processing tweak [{}/{}]: {}",
                index + 1,
                tweaks.len(),
                tweak.name
            ));

            let mut paths_succeeded = 0usize;
            let mut paths_failed = 0usize;
            let mut failures: Vec<PathFailure> = Vec::new();
            let mut attempted = 0usize;

            for (path_index, path) in tweak.paths.iter().enumerate() {
                if self.cancel.load(Ordering::SeqCst) {
                    cancelled = true;
                    // Classify the interrupted tweak from what was attempted.
                    if attempted > 0 {
                        reports.push(Self::classify(tweak, paths_succeeded, paths_failed, failures));
                        Self::log_tweak_status(&log, reports.last().unwrap());
                    }
                    break 'tweaks;
                }

                log(format!(
                    "[>] Tweak {}: Processing path [{}/{}]: {}",
                    tweak.name,
                    path_index + 1,
                    tweak.paths.len(),
                    path
                ));

                attempted += 1;
                match runner::run_path(self.applier, path) {
                    Ok(()) => {
                        paths_succeeded += 1;
                        log(format!("[+] Successfully exploited path: {}", path));
                    }
                    Err(err) => {
                        paths_failed += 1;
                        log(format!("[!] Error applying path: {}", path));
                        log(format!("    Error details: {}", err.reason));
                        failures.push(PathFailure {
                            path: path.clone(),
                            reason: err.reason,
                        });
                    }
                }

                std::thread::sleep(self.path_delay);
            }

            if !cancelled {
                log(format!("[*] Finished processing all paths for {}", tweak.name));
                reports.push(Self::classify(tweak, paths_succeeded, paths_failed, failures));
                Self::log_tweak_status(&log, reports.last().unwrap());
                std::thread::sleep(self.tweak_delay);
            }
        }

        let applied = reports
            .iter()
            .filter(|r| r.outcome == TweakOutcome::Applied)
            .count();
        let failed = reports.len() - applied;

        let outcome = if failed == 0 {
            RunOutcome::Success
        } else if applied > 0 {
            RunOutcome::Partial
        } else {
            RunOutcome::Failed
        };

        let report = RunReport {
            outcome,
            applied,
            failed,
            tweaks: reports,
            cancelled,
            finished_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        Self::log_summary(&log, &report);
        let _ = events.send(BatchEvent::Finished(report.clone()));
        report
    }

    fn classify(
        tweak: &TweakDefinition,
        paths_succeeded: usize,
        paths_failed: usize,
        failures: Vec<PathFailure>,
    ) -> TweakReport {
        let outcome = if paths_failed == 0 && paths_succeeded > 0 {
            TweakOutcome::Applied
        } else if paths_succeeded > 0 {
            TweakOutcome::Partial
        } else {
            TweakOutcome::Failed
        };
        TweakReport {
            name: tweak.name.clone(),
            outcome,
            paths_succeeded,
            paths_failed,
            failures,
        }
    }

    fn log_tweak_status(log: &dyn Fn(String), report: &TweakReport) {
        log("----------------------------------------------".to_string());
        match report.outcome {
            TweakOutcome::Applied => {
                log(format!("[=] TWEAK STATUS: {} - SUCCESSFULLY APPLIED", report.name));
                log(format!(
                    "    All {} paths successfully modified",
                    report.paths_succeeded
                ));
            }
            TweakOutcome::Partial => {
                log(format!("[=] TWEAK STATUS: {} - PARTIALLY APPLIED", report.name));
                log(format!("    {} paths succeeded", report.paths_succeeded));
                log(format!("    {} paths failed", report.paths_failed));
            }
            TweakOutcome::Failed => {
                log(format!("[=] TWEAK STATUS: {} - FAILED", report.name));
                log(format!("    All {} paths failed to apply", report.paths_failed));
            }
        }
        if !report.failures.is_empty() {
            log("    Failure details:".to_string());
            for (i, failure) in report.failures.iter().enumerate() {
                log(format!("      {}. Path: {}", i + 1, failure.path));
                log(format!("         Reason: {}", failure.reason));
            }
        }
        log("----------------------------------------------".to_string());
    }

    fn log_summary(log: &dyn Fn(String), report: &RunReport) {
        log("================================================".to_string());
        log("            FINAL OPERATION RESULT              ".to_string());
        log("================================================".to_string());
        if report.cancelled {
            log("[!] Run cancelled by user; remaining tweaks were not attempted".to_string());
        }
        if report.applied > 0 {
            log(format!("[+] {} tweaks successfully applied", report.applied));
        }
        if report.failed > 0 {
            log(format!("[!] {} tweaks failed to apply", report.failed));
        }
        match report.outcome {
            RunOutcome::Success => {
                log(format!(
                    "[+] SUCCESS: All {} tweaks applied successfully!",
                    report.applied
                ));
            }
            RunOutcome::Partial => {
                log(format!(
                    "[!] PARTIAL SUCCESS: {} tweaks applied, {} failed",
                    report.applied, report.failed
                ));
            }
            RunOutcome::Failed => {
                log("[!] FAILED: Could not apply any tweaks".to_string());
            }
        }
        if report.applied > 0 {
            log("[*] NEXT STEPS:".to_string());
            log("    1. Respring your device to apply changes".to_string());
            log("    2. Go to Settings > Display & Brightness".to_string());
            log("    3. Tap Display Zoom and switch views to trigger respring".to_string());
        } else {
            log("[*] NEXT STEPS:".to_string());
            log("    Try again with different tweaks or check device compatibility".to_string());
        }
        log(format!("[*] Operation completed at {}", report.finished_at));
        log("================================================".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::FakeApplier;
    use crate::tweaks::TweakCategory;
    use std::sync::{mpsc, Mutex};

    fn tweak(name: &str, paths: &[&str]) -> TweakDefinition {
        TweakDefinition::new(
            "wrench.fill",
            name,
            paths.iter().map(|p| p.to_string()).collect(),
            "",
            TweakCategory::Experimental,
        )
    }

    fn run(applier: &FakeApplier, tweaks: &[TweakDefinition]) -> RunReport {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = mpsc::channel();
        BatchRunner::new(applier, cancel).without_delays().run(tweaks, &tx)
    }

    #[test]
    fn invokes_runner_once_per_path_in_order() {
        let applier = FakeApplier::new(&[]);
        let tweaks = vec![tweak("One", &["/a", "/b"]), tweak("Two", &["/c"])];
        run(&applier, &tweaks);
        assert_eq!(applier.call_log(), vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn all_paths_succeeding_is_applied() {
        let applier = FakeApplier::new(&[]);
        let report = run(&applier, &[tweak("One", &["/a", "/b"])]);
        assert_eq!(report.tweaks[0].outcome, TweakOutcome::Applied);
        assert_eq!(report.tweaks[0].paths_succeeded, 2);
        assert_eq!(report.tweaks[0].paths_failed, 0);
        assert!(report.tweaks[0].failures.is_empty());
    }

    #[test]
    fn mixed_results_are_partial_with_failure_record() {
        // The worked example: "/a" succeeds, "/b" is permission-denied.
        let applier = FakeApplier::new(&[("/b", libc::EACCES)]);
        let report = run(&applier, &[tweak("Hide the Dock", &["/a", "/b"])]);
        let t = &report.tweaks[0];
        assert_eq!(t.outcome, TweakOutcome::Partial);
        assert_eq!(t.paths_succeeded, 1);
        assert_eq!(t.paths_failed, 1);
        assert_eq!(t.failures.len(), 1);
        assert_eq!(t.failures[0].path, "/b");
        assert_eq!(t.failures[0].reason, "Permission denied - Cannot access the file");
    }

    #[test]
    fn all_paths_failing_is_failed() {
        let applier = FakeApplier::new(&[("/a", libc::ENOENT), ("/b", libc::EPERM)]);
        let report = run(&applier, &[tweak("One", &["/a", "/b"])]);
        assert_eq!(report.tweaks[0].outcome, TweakOutcome::Failed);
        assert_eq!(report.tweaks[0].failures.len(), 2);
    }

    #[test]
    fn run_with_no_failed_tweaks_is_success() {
        let applier = FakeApplier::new(&[]);
        let tweaks = vec![
            tweak("Hide the Dock", &["/a", "/b"]),
            tweak("Hide the Home Bar", &["/c"]),
        ];
        let report = run(&applier, &tweaks);
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn partially_applied_tweak_counts_as_failed_at_run_level() {
        let applier = FakeApplier::new(&[("/b", libc::EACCES)]);
        let tweaks = vec![tweak("One", &["/a", "/b"]), tweak("Two", &["/c"])];
        let report = run(&applier, &tweaks);
        assert_eq!(report.outcome, RunOutcome::Partial);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn run_with_nothing_applied_is_failed() {
        let applier = FakeApplier::new(&[("/a", libc::ENOENT), ("/b", libc::ENOENT)]);
        let tweaks = vec![tweak("One", &["/a"]), tweak("Two", &["/b"])];
        let report = run(&applier, &tweaks);
        assert_eq!(report.outcome, RunOutcome::Failed);
        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let applier = FakeApplier::new(&[("/a", libc::ENOENT)]);
        let tweaks = vec![tweak("One", &["/a"]), tweak("Two", &["/b"])];
        let report = run(&applier, &tweaks);
        assert_eq!(applier.call_log(), vec!["/a", "/b"]);
        assert_eq!(report.tweaks[1].outcome, TweakOutcome::Applied);
    }

    #[test]
    fn cancellation_stops_before_the_next_path() {
        // Applier that requests cancellation from inside the first call, the
        // way the UI would between steps.
        struct CancelAfterFirst {
            cancel: Arc<AtomicBool>,
            calls: Mutex<Vec<String>>,
        }
        impl PathApplier for CancelAfterFirst {
            fn apply(&self, path: &std::ffi::CStr) -> i32 {
                self.calls
                    .lock()
                    .unwrap()
                    .push(path.to_string_lossy().into_owned());
                self.cancel.store(true, Ordering::SeqCst);
                0
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let applier = CancelAfterFirst {
            cancel: cancel.clone(),
            calls: Mutex::new(Vec::new()),
        };
        let (tx, _rx) = mpsc::channel();
        let tweaks = vec![tweak("One", &["/a", "/b"]), tweak("Two", &["/c"])];
        let report = BatchRunner::new(&applier, cancel).without_delays().run(&tweaks, &tx);

        assert!(report.cancelled);
        // "/a" was applied, then the flag stopped "/b" and tweak Two.
        assert_eq!(*applier.calls.lock().unwrap(), vec!["/a"]);
        assert_eq!(report.tweaks.len(), 1);
        assert_eq!(report.tweaks[0].outcome, TweakOutcome::Applied);
        assert_eq!(report.tweaks[0].paths_succeeded, 1);
    }

    #[test]
    fn finished_event_carries_the_report() {
        let applier = FakeApplier::new(&[]);
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        BatchRunner::new(&applier, cancel)
            .without_delays()
            .run(&[tweak("One", &["/a"])], &tx);
        let finished = rx
            .try_iter()
            .find_map(|e| match e {
                BatchEvent::Finished(r) => Some(r),
                _ => None,
            })
            .expect("finished event");
        assert_eq!(finished.outcome, RunOutcome::Success);
    }
}
