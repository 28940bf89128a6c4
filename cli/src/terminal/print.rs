use std::cell::Cell;

use crate::terminal::colors;
use colored::*;
use console::measure_text_width;
use tracing::info;

pub const TOTAL_WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "recce::print";

/// Key column width inside a report tree.
const TREE_KEY_WIDTH: usize = 7;

thread_local! {
    static KEY_WIDTH: Cell<usize> = const { Cell::new(0) }
}

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

/// Raw terminal line, bypassing the log prefixes.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// Width `aligned_line` pads keys to on this thread.
pub fn set_key_width(width: usize) {
    KEY_WIDTH.set(width);
}

/// `label` centered in a `fill` rule spanning the full width.
fn ruled(label: &str, fill: &str) -> String {
    let pad = TOTAL_WIDTH.saturating_sub(measure_text_width(label));
    let left = pad / 2;
    format!(
        "{}{}{}",
        fill.repeat(left).bright_black(),
        label,
        fill.repeat(pad - left).bright_black()
    )
}

pub fn banner(quiet: u8) {
    if quiet > 0 {
        return;
    }
    let title = format!("⟦ RECCE v{} ⟧", env!("CARGO_PKG_VERSION"));
    print(&ruled(&title.bright_green().bold().to_string(), "═"));
}

pub fn header(msg: &str, quiet: u8) {
    if quiet > 0 {
        return;
    }
    let label = format!("⟦ {} ⟧", msg.to_uppercase());
    print(&ruled(&label.bright_green().to_string(), "─"));
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).bright_black().to_string());
}

/// `key....: value` with keys padded to the width set by [`set_key_width`].
pub fn aligned_line(key: &str, value: &str) {
    let dots = ".".repeat((KEY_WIDTH.get() + 1).saturating_sub(key.len()));
    print_status(format!(
        "{}{}{} {}",
        key.color(colors::PRIMARY),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR),
        value.color(colors::TEXT_DEFAULT)
    ));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    print(&format!(
        "{} {}",
        ">".color(colors::SEPARATOR),
        msg.as_ref().color(colors::TEXT_DEFAULT)
    ));
}

pub fn tree_head(idx: usize, name: &str) {
    print(&format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    ));
}

/// One host's details as a single-level tree.
pub fn as_tree_one_level(details: Vec<(String, ColoredString)>) {
    let last = details.len().saturating_sub(1);
    for (i, (key, value)) in details.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        print(&format!(
            " {} {}{}{} {}",
            branch.bright_black(),
            key.color(colors::TEXT_DEFAULT),
            ".".repeat(TREE_KEY_WIDTH.saturating_sub(key.len())).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(measure_text_width(msg)) / 2);
    print(&format!("{space}{msg}"));
}

pub fn no_results() {
    centerln(&"no live hosts, open ports or findings".red().bold().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruled_lines_span_the_full_width() {
        assert_eq!(measure_text_width(&ruled("⟦ SCAN ⟧", "─")), TOTAL_WIDTH);
        assert_eq!(measure_text_width(&ruled("odd", "═")), TOTAL_WIDTH);
        let long = "x".repeat(TOTAL_WIDTH + 5);
        assert_eq!(measure_text_width(&ruled(&long, "─")), TOTAL_WIDTH + 5);
    }
}
