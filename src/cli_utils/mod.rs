// Terminal output helpers for the provisioner binary
pub mod formatting;

pub use formatting::{format_record, format_table, print_header, print_report_summary};

/// Print a success message
pub fn print_success(message: &str) {
    use colored::Colorize;
    eprintln!("{}", format!("✓ {}", message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    use colored::Colorize;
    eprintln!("{}", format!("ℹ {}", message).bright_cyan());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    use colored::Colorize;
    eprintln!("{}", format!("⚠ {}", message).yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    use colored::Colorize;
    eprintln!("{}", format!("✗ {}", message).red());
}
