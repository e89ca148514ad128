pub mod sha;
pub mod version;

/// Join path segments with a single `/`, dropping empty and `.` segments.
/// The result is absolute only when the first non-empty segment is.
pub fn join_path(parts: &[&str]) -> String {
    let absolute = parts.iter().find(|part| !part.is_empty()).map_or(false, |part| part.starts_with('/'));
    let joined = parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<&str>>()
        .join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}
