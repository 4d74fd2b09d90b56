/// Strips the quoting object stores wrap around ETag header values.
///
/// `"9b2cf5"` and ` 9b2cf5 ` both become `9b2cf5`; the tag is otherwise
/// forwarded verbatim.
pub fn normalize_integrity_tag(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}
