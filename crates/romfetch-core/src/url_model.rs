//! Archive URL helpers: `.zip` detection and local filename derivation.

use percent_encoding::percent_decode_str;
use url::Url;

/// True if the href names a `.zip` archive: the text after its last `.` is `zip`.
///
/// Query strings and fragments are ignored so `rom.zip?mirror=1` still counts.
pub fn is_zip_link(href: &str) -> bool {
    let path = href
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    path.rsplit_once('.')
        .map(|(_, ext)| ext == "zip")
        .unwrap_or(false)
}

/// Extracts the last path segment of `url` for use as the archive filename.
///
/// Returns `None` if the URL cannot be parsed or its path has no usable segment.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let name = sanitize_filename(&decoded);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// Replaces path separators, NUL and control characters with `_` and trims
/// leading/trailing dots and whitespace. Output is capped at 255 bytes (NAME_MAX).
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
