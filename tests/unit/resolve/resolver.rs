use std::io::Cursor;

use super::*;
use crate::foundation::error::CombineError;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "texcombine_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &Path, w: u32, h: u32) {
    let img = image::RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([(x * 10) as u8, (y * 10) as u8, 7, 255])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

#[test]
fn fallback_colors_are_memoized_by_value() {
    let resolver = ChannelSourceResolver::new(".");
    let a = resolver.fallback(Rgba::GREY);
    let b = resolver.fallback(Rgba::new(0.5, 0.5, 0.5, 1.0));
    let c = resolver.fallback(Rgba::WHITE);

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(resolver.fallback_cache_len(), 2);
    assert_eq!(a.resolution(), Resolution::new(1, 1));
    assert_eq!(a.texel(0, 0), [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn fallback_cache_is_shared_across_threads() {
    let resolver = Arc::new(ChannelSourceResolver::new("."));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = Arc::clone(&resolver);
            std::thread::spawn(move || Arc::as_ptr(&r.fallback(Rgba::BLACK)) as usize)
        })
        .collect();
    let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(resolver.fallback_cache_len(), 1);
}

#[test]
fn resolve_file_probes_without_decoding() {
    let tmp = temp_dir("resolve_probe");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("albedo.png"), 12, 5);

    let resolver = ChannelSourceResolver::new(&tmp);
    let src = resolver
        .resolve(&SourceDescriptor::path("./albedo.png"))
        .unwrap();
    assert_eq!(src.resolution(), Resolution::new(12, 5));
    assert!(src.needs_raw_copy());
    assert!(!src.is_fallback());
    assert_eq!(src.label(), "albedo.png");
    assert_eq!(resolver.raw_stats(), RawStats::default());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn resolve_missing_file_is_source_unavailable() {
    let resolver = ChannelSourceResolver::new(temp_dir("resolve_missing"));
    let err = resolver
        .resolve(&SourceDescriptor::path("nope.png"))
        .unwrap_err();
    assert!(matches!(err, CombineError::SourceUnavailable(_)));
}

#[test]
fn resolve_rejects_escaping_paths() {
    let resolver = ChannelSourceResolver::new(".");
    let err = resolver
        .resolve(&SourceDescriptor::path("../secret.png"))
        .unwrap_err();
    assert!(matches!(err, CombineError::Validation(_)));
}

#[test]
fn memory_and_fallback_sources_are_not_duplicated() {
    let resolver = ChannelSourceResolver::new(".");
    let img = Arc::new(SampledImage::solid(Rgba::WHITE));
    let mem = resolver
        .resolve(&SourceDescriptor::Image(Arc::clone(&img)))
        .unwrap();
    let fb = resolver
        .resolve(&SourceDescriptor::color(Rgba::BLACK))
        .unwrap();

    assert!(!mem.needs_raw_copy());
    assert!(fb.is_fallback());
    assert!(Arc::ptr_eq(&resolver.acquire_raw(&mem).unwrap(), &img));
    assert_eq!(resolver.raw_stats().acquired, 0);
}

#[test]
fn has_alpha_reads_header() {
    let tmp = temp_dir("resolve_alpha");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("a.png"), 2, 2);
    image::RgbImage::new(2, 2)
        .save_with_format(tmp.join("rgb.png"), image::ImageFormat::Png)
        .unwrap();

    let resolver = ChannelSourceResolver::new(&tmp);
    assert!(resolver.has_alpha("a.png").unwrap());
    assert!(!resolver.has_alpha("rgb.png").unwrap());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn descriptor_debug_does_not_dump_pixels() {
    let desc = SourceDescriptor::image(SampledImage::solid(Rgba::WHITE));
    assert_eq!(format!("{desc:?}"), "Image(1x1)");
}
