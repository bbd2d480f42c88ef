use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner style used during ongoing operations.
/// - Yellow spinner with animated braille-style frames.
/// - Displays the current message (`{wide_msg}`) next to the spinner.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Style used when an operation finishes successfully.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

/// Style used when an operation fails with an error.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

/// A ticking spinner for a whole command.
///
/// In verbose mode the spinner is hidden so it does not fight with the
/// debug log lines written to the same terminal.
pub fn spinner(verbose: bool) -> ProgressBar {
    if verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
