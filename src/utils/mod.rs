/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Drop any `#fragment` and `?query` from a URL.
pub fn strip_fragment(url: &str) -> &str {
    // split always yields at least one item
    url.split(|c| c == '#' || c == '?').next().unwrap_or(url)
}

/// Final path segment of a download URL, usable as a local file name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = strip_fragment(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let name = sanitize_filename(segment);
    let name = name.trim_matches(|c| c == '.' || c == ' ');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Human readable byte count (binary units).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.whl"), "test_file.whl");
        assert_eq!(sanitize_filename("normal-name.tar.gz"), "normal-name.tar.gz");
    }

    #[test]
    fn test_strip_fragment_is_idempotent() {
        let url = "https://files.example/pkg-1.0.tar.gz#sha256=abcdef";
        let once = strip_fragment(url);
        assert_eq!(once, "https://files.example/pkg-1.0.tar.gz");
        assert_eq!(strip_fragment(once), once);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://x/packages/ab/cd/pkg-1.0.1-py3-none-any.whl#sha256=00ff"),
            Some("pkg-1.0.1-py3-none-any.whl".to_string())
        );
        assert_eq!(
            file_name_from_url("../../packages/pkg-2.0.tar.gz?download=1"),
            Some("pkg-2.0.tar.gz".to_string())
        );
        assert_eq!(file_name_from_url("https://x/dir/"), None);
        assert_eq!(file_name_from_url("#only-fragment"), None);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MiB");
    }
}
