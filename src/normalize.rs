/// Canonicalize raw source text: drop a leading BOM, turn `\r\n` and lone `\r`
/// into `\n`, and trim the outer whitespace.
pub fn normalize_text(raw: &str) -> String {
    normalize_lines(raw).trim().to_string()
}

/// Same as [`normalize_text`] without the final trim.
pub fn normalize_lines(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    raw.replace("\r\n", "\n").replace('\r', "\n")
}
