use regex::Regex;

/// Lowercase URL-friendly slug: non-ASCII stripped, whitespace and hyphen
/// runs collapsed to single hyphens.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let invalid = Regex::new(r"[^a-zA-Z0-9\s-]").unwrap();
    let cleaned = invalid.replace_all(&ascii, "").to_lowercase();
    let runs = Regex::new(r"[\s-]+").unwrap();
    runs.replace_all(&cleaned, "-").trim_matches('-').to_string()
}

/// Replace anything unsafe for a filename with underscores.
pub fn safe_filename(value: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9._-]").unwrap();
    re.replace_all(value, "_").to_string()
}
