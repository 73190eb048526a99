use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use logscout::scan::{FileStatus, SharedError};
use logscout::view::{highlight_level, FileRow, HighlightLevel};
use logscout::{Event, ScanView};
use std::path::PathBuf;

/// Drives the progress bar while a scan runs and prints the report after
pub struct Renderer {
    view: ScanView,
    bar: ProgressBar,
}

impl Renderer {
    pub fn new(files: &[PathBuf], tail_max: usize) -> Self {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        Self {
            view: ScanView::new(files, tail_max),
            bar,
        }
    }

    pub fn handle(&mut self, event: &Event, paused: bool) {
        self.view.apply(event);
        self.view.set_paused(paused);

        if let Event::Totals(_) = event {
            self.refresh();
        }
    }

    fn refresh(&self) {
        let totals = self.view.totals();
        self.bar.set_position(totals.files_done as u64);

        let mut msg = format!(
            "| lines {} | matches {}",
            totals.lines_total, totals.matches_total
        );
        if self.view.is_paused() {
            msg.push_str(&format!(" {}", "PAUSED".yellow().bold()));
        }
        self.bar.set_message(msg);
    }

    /// Clears the bar, prints the report and hands back the run-level error
    pub fn finish(self) -> Option<SharedError> {
        self.bar.finish_and_clear();

        for row in self.view.rows() {
            print_row(row);
        }

        let totals = self.view.totals();
        println!(
            "\nScanned {}/{} files, {} lines, {} matches",
            totals.files_done, totals.files_total, totals.lines_total, totals.matches_total
        );

        let mut tail = self.view.tail().peekable();
        if tail.peek().is_some() {
            println!("\nRecent matches:");
            for m in tail {
                println!(
                    "{} {}: {}",
                    format!("[{}]", m.seq).dimmed(),
                    m.file.display().to_string().blue(),
                    highlight(&m.line)
                );
            }
        }

        self.view.error().cloned()
    }
}

fn status_label(status: FileStatus) -> ColoredString {
    let label = format!("{:<6}", status);
    match status {
        FileStatus::Done => label.green(),
        FileStatus::Failed => label.red().bold(),
        FileStatus::Queued => label.dimmed(),
    }
}

fn print_row(row: &FileRow) {
    let path = row.file.display().to_string();
    match &row.error {
        Some(e) => println!("{} {} {}", status_label(row.status), path, e.to_string().red()),
        None => println!(
            "{} {} lines={} matches={}",
            status_label(row.status),
            path,
            row.lines,
            row.matches
        ),
    }
}

fn highlight(line: &str) -> ColoredString {
    match highlight_level(line) {
        HighlightLevel::Error => line.red(),
        HighlightLevel::Warn => line.yellow(),
        HighlightLevel::Plain => line.normal(),
    }
}
