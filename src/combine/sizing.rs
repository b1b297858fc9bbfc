use crate::foundation::core::Resolution;

/// Sources at or below this size on an axis are placeholders and do not vote on that axis.
pub const PLACEHOLDER_MAX_DIM: u32 = 4;

/// Negotiate the packed output size from the source sizes.
///
/// Each axis independently takes the smallest dimension that exceeds
/// [`PLACEHOLDER_MAX_DIM`], or [`PLACEHOLDER_MAX_DIM`] itself when no source qualifies. Solid-color
/// fallbacks therefore never collapse the output, and real images are never upsampled.
pub fn negotiate_resolution(sources: impl IntoIterator<Item = Resolution>) -> Resolution {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    for r in sources {
        if r.width > PLACEHOLDER_MAX_DIM {
            width = Some(width.map_or(r.width, |w| w.min(r.width)));
        }
        if r.height > PLACEHOLDER_MAX_DIM {
            height = Some(height.map_or(r.height, |h| h.min(r.height)));
        }
    }
    Resolution::new(
        width.unwrap_or(PLACEHOLDER_MAX_DIM),
        height.unwrap_or(PLACEHOLDER_MAX_DIM),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/combine/sizing.rs"]
mod tests;
