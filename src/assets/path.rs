use crate::foundation::error::{CombineError, CombineResult};

/// Normalize and validate root-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> CombineResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') || has_drive_prefix(&s) {
        return Err(CombineError::validation(format!(
            "asset paths must be relative (got '{source}')"
        )));
    }
    if s.is_empty() {
        return Err(CombineError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CombineError::validation(format!(
                "asset paths must not contain '..' (got '{source}')"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CombineError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Derive a packed-texture path from a material asset path.
///
/// Strips the material's extension and appends `suffix` plus `ext`:
/// `"Mats/Rock.mat"` with `("_MaskMap", "png")` becomes `"Mats/Rock_MaskMap.png"`.
pub fn output_path_for(asset_path: &str, suffix: &str, ext: &str) -> String {
    let file_start = asset_path.rfind('/').map_or(0, |i| i + 1);
    let stem_end = match asset_path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => file_start + dot,
        _ => asset_path.len(),
    };
    let ext = ext.trim_start_matches('.');
    format!("{}{suffix}.{ext}", &asset_path[..stem_end])
}

fn has_drive_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}
