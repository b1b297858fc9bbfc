use std::sync::Arc;

use crate::{
    foundation::core::SampledImage,
    foundation::error::CombineResult,
    resolve::resolver::{ChannelSourceResolver, ResolvedSource, SourceIdentity},
};

struct RawEntry {
    identity: SourceIdentity,
    label: String,
    image: Arc<SampledImage>,
    duplicated: bool,
}

/// Scoped set of decode-ready buffers for one combine call.
///
/// A source read by several slots is materialized once. Duplicates are released when the set is
/// dropped, on success and on every error path alike. Sources that are already in memory are
/// borrowed as-is and never released.
pub(crate) struct RawSet<'r> {
    resolver: &'r ChannelSourceResolver,
    entries: Vec<RawEntry>,
}

impl<'r> RawSet<'r> {
    pub(crate) fn new(resolver: &'r ChannelSourceResolver) -> Self {
        Self {
            resolver,
            entries: Vec::with_capacity(4),
        }
    }

    pub(crate) fn acquire(&mut self, src: &ResolvedSource) -> CombineResult<Arc<SampledImage>> {
        let identity = src.identity();
        if let Some(e) = self.entries.iter().find(|e| e.identity == identity) {
            return Ok(Arc::clone(&e.image));
        }

        let image = self.resolver.acquire_raw(src)?;
        self.entries.push(RawEntry {
            identity,
            label: src.label(),
            image: Arc::clone(&image),
            duplicated: src.needs_raw_copy(),
        });
        Ok(image)
    }

    pub(crate) fn duplicate_count(&self) -> usize {
        self.entries.iter().filter(|e| e.duplicated).count()
    }
}

impl Drop for RawSet<'_> {
    fn drop(&mut self) {
        for entry in self.entries.drain(..) {
            if entry.duplicated {
                self.resolver.release_raw(&entry.label);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/raw.rs"]
mod tests;
