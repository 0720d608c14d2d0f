use std::io::{self, BufRead, Write};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{msg} {spinner}")
            .unwrap(),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Ask until the user types exactly 'y' or 'n'.
pub fn confirm() -> Result<bool> {
    let stdin = io::stdin();
    loop {
        print!(
            "{} ",
            "Press 'y' to continue or 'n' to cancel, then press Enter:".yellow()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        stdin.lock().read_line(&mut input)?;
        match input.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => println!("{}", "Invalid input. Please try again.".red()),
        }
    }
}
