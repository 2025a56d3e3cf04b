use colored::Colorize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print an indented cause line under an error
pub fn cause(msg: &str) {
    eprintln!("  {} {}", "caused by:".dimmed(), msg);
}
