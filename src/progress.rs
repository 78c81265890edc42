// Interactive progress display for in-flight requests.
//
// A `ProgressReporter` owns a spinner driven by its own thread. The thread
// polls elapsed time every `TICK`, classifies the request phase and
// redraws. It never influences the request itself and is stopped by
// `finish` or, on any other exit path, by `Drop`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(100);
const PREPARING_LIMIT: Duration = Duration::from_secs(1);
const EXPECTED_LIMIT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Preparing,
    Requesting,
    Overtime,
    Timeout,
}

impl RequestStatus {
    /// Phase of a request that has been running for `elapsed`.
    pub fn classify(elapsed: Duration) -> Self {
        if elapsed < PREPARING_LIMIT {
            RequestStatus::Preparing
        } else if elapsed <= EXPECTED_LIMIT {
            RequestStatus::Requesting
        } else {
            RequestStatus::Overtime
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RequestStatus::Preparing => "preparing",
            RequestStatus::Requesting => "requesting",
            RequestStatus::Overtime => "taking longer than expected",
            RequestStatus::Timeout => "timed out",
        };
        f.write_str(text)
    }
}

fn status_line(label: &str, elapsed: Duration) -> String {
    let status = RequestStatus::classify(elapsed);
    let secs = elapsed.as_secs_f64();
    match status {
        RequestStatus::Requesting => {
            let remaining = EXPECTED_LIMIT.as_secs_f64() - secs;
            format!("[{status}] {label} {secs:.1}s (about {remaining:.1}s left)")
        }
        _ => format!("[{status}] {label} {secs:.1}s"),
    }
}

/// Where spinners are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTarget {
    Stderr,
    Hidden,
}

impl ProgressTarget {
    fn draw_target(self) -> ProgressDrawTarget {
        match self {
            ProgressTarget::Stderr => ProgressDrawTarget::stderr(),
            ProgressTarget::Hidden => ProgressDrawTarget::hidden(),
        }
    }
}

/// Running count of reporters started and of spinner threads still alive.
#[derive(Debug, Default)]
pub struct ReporterTally {
    started: AtomicUsize,
    running: AtomicUsize,
}

impl ReporterTally {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

enum Signal {
    Stop(Option<RequestStatus>),
}

pub struct ProgressReporter {
    stop: Option<Sender<Signal>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start a spinner for the request described by `label`. The reporter
    /// is counted in `tally` until its thread exits.
    pub fn start(
        label: impl Into<String>,
        target: ProgressTarget,
        tally: Arc<ReporterTally>,
    ) -> Self {
        let label = label.into();
        let (tx, rx) = mpsc::channel::<Signal>();
        tally.started.fetch_add(1, Ordering::SeqCst);
        tally.running.fetch_add(1, Ordering::SeqCst);

        let handle = thread::spawn(move || {
            let spinner = ProgressBar::with_draw_target(None, target.draw_target());
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                spinner.set_style(style);
            }
            let started = Instant::now();
            spinner.set_message(status_line(&label, Duration::ZERO));

            let final_status = loop {
                match rx.recv_timeout(TICK) {
                    Ok(Signal::Stop(status)) => break status,
                    Err(RecvTimeoutError::Disconnected) => break None,
                    Err(RecvTimeoutError::Timeout) => {
                        spinner.set_message(status_line(&label, started.elapsed()));
                        spinner.tick();
                    }
                }
            };

            match final_status {
                Some(status) => spinner.abandon_with_message(format!(
                    "[{status}] {label} {:.1}s",
                    started.elapsed().as_secs_f64()
                )),
                None => spinner.finish_and_clear(),
            }
            tally.running.fetch_sub(1, Ordering::SeqCst);
        });

        ProgressReporter {
            stop: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stop the spinner, leaving a final status line behind.
    pub fn finish(mut self, status: RequestStatus) {
        self.shutdown(Some(status));
    }

    fn shutdown(&mut self, status: Option<RequestStatus>) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(Signal::Stop(status));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(label: &str) -> ProgressReporter {
        ProgressReporter::start(label, ProgressTarget::Hidden, Arc::default())
    }

    #[test]
    fn classifies_phases_by_elapsed_time() {
        assert_eq!(
            RequestStatus::classify(Duration::from_millis(300)),
            RequestStatus::Preparing
        );
        assert_eq!(
            RequestStatus::classify(Duration::from_secs(1)),
            RequestStatus::Requesting
        );
        assert_eq!(
            RequestStatus::classify(Duration::from_secs(20)),
            RequestStatus::Requesting
        );
        assert_eq!(
            RequestStatus::classify(Duration::from_millis(20_100)),
            RequestStatus::Overtime
        );
    }

    #[test]
    fn requesting_line_shows_remaining_estimate() {
        let line = status_line("GET /x", Duration::from_secs(5));
        assert!(line.contains("requesting"));
        assert!(line.contains("15.0s left"));
        assert!(!status_line("GET /x", Duration::from_secs(25)).contains("left"));
    }

    #[test]
    fn drop_stops_the_reporter_thread() {
        let reporter = hidden("GET /metric/dashboard");
        thread::sleep(Duration::from_millis(250));
        assert!(reporter.is_running());
        drop(reporter);
    }

    #[test]
    fn tally_tracks_thread_lifetime() {
        let tally = Arc::new(ReporterTally::default());
        let reporter = ProgressReporter::start("GET /user", ProgressTarget::Hidden, tally.clone());
        assert_eq!(tally.started(), 1);
        assert_eq!(tally.running(), 1);
        reporter.finish(RequestStatus::Requesting);
        assert_eq!(tally.running(), 0);

        drop(ProgressReporter::start(
            "GET /user",
            ProgressTarget::Hidden,
            tally.clone(),
        ));
        assert_eq!(tally.started(), 2);
        assert_eq!(tally.running(), 0);
    }

    #[test]
    fn finish_joins_immediately() {
        let reporter = hidden("GET /user");
        let started = Instant::now();
        reporter.finish(RequestStatus::Timeout);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
