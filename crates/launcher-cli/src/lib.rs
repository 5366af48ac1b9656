//! Command-line front end for app-launcher.

pub mod logging;
pub mod progress;
pub mod prompt;

use std::path::Path;

/// Arguments the relaunched launcher needs to find the same installation.
///
/// Only paths that were given explicitly are forwarded; defaults resolve
/// the same way after the swap.
pub fn relaunch_args(root: Option<&Path>, config: Option<&Path>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(root) = root {
        args.push("--root".to_string());
        args.push(root.display().to_string());
    }
    if let Some(config) = config {
        args.push("--config".to_string());
        args.push(config.display().to_string());
    }
    args
}
