//! Command: print version information.

/// Print the dots version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    let version = option_env!("DOTS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("dots {version}");
}
