//! Shared CLI output formatting. Everything here goes to stderr; stdout is
//! reserved for results.

use crate::pipeline::StatsSnapshot;
use crate::types::Category;
use std::io::IsTerminal;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // Respect NO_COLOR env (https://no-color.org/)
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    /// Builder with color forced off, for tests and piped output.
    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Green checkmark symbol.
    pub fn ok_sym(&self) -> &str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    /// Red X symbol.
    pub fn fail_sym(&self) -> &str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    /// Yellow warning symbol.
    pub fn warn_sym(&self) -> &str {
        if self.use_color {
            "\x1b[33m\u{26a0}\x1b[0m"
        } else {
            "??"
        }
    }

    /// Blue circle (info/neutral) symbol.
    pub fn info_sym(&self) -> &str {
        if self.use_color {
            "\x1b[34m\u{25cb}\x1b[0m"
        } else {
            "--"
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint(YELLOW, s)
    }

    pub fn cyan(&self, s: &str) -> String {
        self.paint(CYAN, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }
}

/// Print a branded header for CLI output.
pub fn print_header(s: &Styled) {
    eprintln!(
        "  {} {}",
        s.bold("urlsift"),
        s.dim(&format!("v{}", env!("CARGO_PKG_VERSION")))
    );
    eprintln!();
}

/// Print a section header.
pub fn print_section(s: &Styled, title: &str) {
    eprintln!("  {}", s.bold(title));
}

/// Print a result line with symbol and label/value.
pub fn print_check(symbol: &str, label: &str, value: &str) {
    eprintln!("    {symbol} {label:<16} {value}");
}

/// Format a duration in seconds into human-readable (e.g., "2h 14m").
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let m = secs / 60;
        let s = secs % 60;
        format!("{m}m {s}s")
    } else {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{h}h {m}m")
    }
}

/// Print a JSON document on stderr, one line, so it never mixes with result lines.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string(value) {
        eprintln!("{s}");
    }
}

/// End-of-run summary on stderr.
pub fn print_summary(s: &Styled, target: &str, snap: &StatsSnapshot) {
    eprintln!();
    print_section(s, &format!("Summary for {target}"));
    print_check(
        s.info_sym(),
        "Duration",
        &format_duration(snap.elapsed_secs as u64),
    );
    print_check(s.info_sym(), "Seen", &snap.seen.to_string());
    print_check(s.info_sym(), "Unique", &snap.unique.to_string());
    print_check(s.info_sym(), "Live", &snap.live.to_string());
    print_check(s.ok_sym(), "Delivered", &snap.delivered.to_string());
    if snap.sink_failures > 0 {
        print_check(
            s.fail_sym(),
            "Write failures",
            &s.red(&snap.sink_failures.to_string()),
        );
    }

    if !snap.categories.is_empty() {
        eprintln!();
        print_section(s, "Classification");
        for (name, count) in &snap.categories {
            print_check(s.warn_sym(), name, &s.yellow(&count.to_string()));
        }
    }
    eprintln!();
}

/// Flash line shown the first time an interesting category turns up.
pub fn flash_line(s: &Styled, category: Category) -> String {
    format!(
        "  {} FIRST {}",
        s.warn_sym(),
        s.bold(&category.as_str().to_uppercase())
    )
}
