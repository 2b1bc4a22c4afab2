// SPDX-License-Identifier: MPL-2.0

//! Helpers shared by the command line tools.

use log::LevelFilter;
use std::path::Path;

/// Install the terminal logger.
/// `RUST_LOG`, when set, refines the level given by `verbosity`.
pub fn init_logger(verbosity: u32) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(verbosity_filter(verbosity));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

pub fn verbosity_filter(verbosity: u32) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Create the parent directory of a file path if needed.
pub fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity_filter(0), LevelFilter::Error);
        assert_eq!(verbosity_filter(2), LevelFilter::Info);
        assert_eq!(verbosity_filter(9), LevelFilter::Trace);
    }
}
