//! Terminal logging with colored module prefixes.
//!
//! The `log!` macro prints `[module] message` with the prefix colored by
//! module type.
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "compiled {} stylesheets", count);
//! ```

use colored::{ColoredString, Colorize};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
pub fn log(module: &str, message: &str) {
    println!("{} {message}", colorize_prefix(module));
}

/// Apply color to a module prefix based on module type.
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "status" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_prefix_wraps_module_in_brackets() {
        for module in ["build", "status", "watch", "error"] {
            let prefix = colorize_prefix(module).to_string();
            assert!(prefix.contains(&format!("[{module}]")));
        }
    }
}
