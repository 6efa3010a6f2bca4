//! Watermark font discovery

use std::path::{Path, PathBuf};

/// Well-known locations of a TrueType sans font on common Linux and macOS installs
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Resolve the watermark font: the configured path if it exists, otherwise the
/// first system candidate found.
pub fn resolve_font_path(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured {
        let path = Path::new(path);
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(font_path = %path.display(), "Configured watermark font not found");
    }

    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}
