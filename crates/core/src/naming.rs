//! Path and name helpers shared by the resolution APIs.

/// The final segment of a slash-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Derive the lookup extension from a path or bare name.
///
/// The extension is whatever follows the last `.` of the final path
/// segment. A segment without a dot is treated as the extension in its
/// entirety, so `noext` maps to `noext`. No case folding is applied.
pub fn extension_of(path: &str) -> &str {
    let name = file_name(path);
    name.rsplit_once('.').map_or(name, |(_, ext)| ext)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
