use std::{
    io::{self, Write},
    sync::Mutex,
    time::Duration,
};

use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use nid_core::{NidError, Reporter, RunPhase, StatsSnapshot, VersionOrigin};
use prettytable::{format, Table};

/// Terminal reporter: a spinner while running and a summary table at the end.
/// Lines that must always be seen fall back to `fallback` (stderr) when the
/// spinner is hidden, e.g. when stderr is not a terminal.
pub struct SpinnerReporter {
    bar: ProgressBar,
    package_name: String,
    version: Mutex<Option<String>>,
    fallback: Mutex<Box<dyn Write + Send>>,
}

impl SpinnerReporter {
    pub fn new(package_name: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        SpinnerReporter::with_bar(bar, package_name, Box::new(io::stderr()))
    }

    fn with_bar(bar: ProgressBar, package_name: &str, fallback: Box<dyn Write + Send>) -> Self {
        SpinnerReporter {
            bar,
            package_name: package_name.to_string(),
            version: Mutex::new(None),
            fallback: Mutex::new(fallback),
        }
    }

    /// Prints above the spinner, or to the fallback writer if the spinner is not drawn.
    fn announce(&self, line: String) {
        if !self.bar.is_hidden() {
            self.bar.println(line);
            return;
        }
        if let Ok(mut out) = self.fallback.lock() {
            let _ = writeln!(out, "{}", line);
        }
    }

    fn set_version(&self, version: &str) {
        if let Ok(mut v) = self.version.lock() {
            *v = Some(version.to_string());
        }
    }

    fn summary_table(&self, snapshot: &StatsSnapshot) -> Table {
        let version = match self.version.lock() {
            Ok(v) => v.clone().unwrap_or_default(),
            Err(_) => String::new(),
        };

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.set_titles(row!["Package", "Version", "Successful", "Failed", "Elapsed", "Rate"]);
        table.add_row(row![
            self.package_name,
            version,
            snapshot.successful_downloads,
            snapshot.failed_downloads,
            HumanDuration(Duration::from_millis(snapshot.elapsed_ms)),
            format!("{:.2}/s", snapshot.downloads_per_second())
        ]);
        table
    }
}

impl Reporter for SpinnerReporter {
    fn on_phase(&self, phase: &RunPhase) {
        match phase {
            RunPhase::ResolvingVersion => self
                .bar
                .set_message(format!("Looking up the latest version of {}...", self.package_name)),
            RunPhase::VerifyingVersion(version) => {
                self.bar.set_message(format!("Verifying version {}...", version))
            }
            RunPhase::VersionVerified(version) => {
                self.set_version(version);
                self.announce(format!("✔ Package version specified: {}", version));
            }
            RunPhase::VersionDiscovered { version, origin } => {
                self.set_version(version);
                let source = match origin {
                    VersionOrigin::QualityIndex => "npms.io",
                    VersionOrigin::Registry | VersionOrigin::Supplied => "npmjs.com",
                };
                self.announce(format!(
                    "✔ Package found on {} with version {}",
                    source, version
                ));
            }
            RunPhase::Running { version, total } => self.bar.set_message(format!(
                "Downloading {}@{} {} times...",
                self.package_name, version, total
            )),
            RunPhase::Completed | RunPhase::Failed => {}
        }
    }

    fn on_progress(&self, snapshot: &StatsSnapshot) {
        self.bar.set_message(format!(
            "Downloads: {} successful, {} failed | {:.2}/s | {} elapsed",
            snapshot.successful_downloads,
            snapshot.failed_downloads,
            snapshot.downloads_per_second(),
            HumanDuration(Duration::from_millis(snapshot.elapsed_ms))
        ));
    }

    fn on_complete(&self, snapshot: &StatsSnapshot) {
        self.bar.finish_and_clear();
        println!("✔ Completed {} downloads\n", snapshot.total());
        self.summary_table(snapshot).printstd();
    }

    fn on_error(&self, error: &NidError) {
        let message = format!("✖ {}", error);
        if self.bar.is_hidden() {
            self.bar.abandon();
            self.announce(message);
        } else {
            self.bar.abandon_with_message(message);
        }
    }
}
