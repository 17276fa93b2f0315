//! System relay ("star") list loading.
//!
//! Stars are configured as invite codes, one per line, either in a file
//! shipped with the app or as a runtime list.

use std::fs;
use std::path::Path;

use skuttle_shared::Star;
use tracing::{debug, info, warn};

/// Load star invites from a file.
///
/// The file format is one invite per line. Empty lines and lines starting
/// with `#` are ignored; malformed invites are logged and skipped, as is a
/// repeated invite.
///
/// # Example file
///
/// ```text
/// # Planetary relays
/// one.planetary.pub:8008:@5KDK98cjIQ8bPoBkvp7bCwBXoQMlWpdIbCFyXER8Lbw=.ed25519~seed
/// ```
pub fn load_stars(path: &Path) -> Vec<Star> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to read stars file"
            );
            return Vec::new();
        }
    };

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    let stars = parse_stars(&lines);

    info!(
        count = stars.len(),
        path = %path.display(),
        "Loaded stars"
    );

    stars
}

/// Parse invite strings into stars, keeping the first of any duplicates.
pub fn parse_stars(raw: &[String]) -> Vec<Star> {
    let mut stars: Vec<Star> = Vec::with_capacity(raw.len());
    for line in raw {
        match line.parse::<Star>() {
            Ok(star) if stars.contains(&star) => {
                debug!(feed = %star.feed, "Skipping duplicate star");
            }
            Ok(star) => {
                debug!(feed = %star.feed, addr = %star.address, "Loaded star");
                stars.push(star);
            }
            Err(e) => warn!(line = %line, error = %e, "Skipping invalid invite"),
        }
    }
    stars
}
