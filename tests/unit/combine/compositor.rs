use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::*;
use crate::encode::sink::{InMemorySink, PlatformFormat, SinkOp};
use crate::foundation::core::Rgba;

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

fn write_png(root: &Path, rel: &str, w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 4]) {
    let img = image::RgbaImage::from_fn(w, h, |x, y| image::Rgba(f(x, y)));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn compositor(root: &Path) -> Compositor {
    Compositor::new(
        Arc::new(ChannelSourceResolver::new(root)),
        CompositorOpts::default(),
    )
}

fn color(c: Rgba, sel: ChannelSelector) -> ChannelSlot {
    ChannelSlot::new(SourceDescriptor::color(c), sel)
}

fn solid_image(w: u32, h: u32, c: Rgba) -> SourceDescriptor {
    SourceDescriptor::image(SampledImage::from_fn(w, h, |_, _| c).unwrap())
}

fn all_fallback(dest: &str) -> CombineRequest {
    CombineRequest::new(
        color(Rgba::new(1.0, 0.0, 0.0, 1.0), ChannelSelector::RED),
        color(Rgba::BLACK, ChannelSelector::GREEN),
        color(Rgba::GREY, ChannelSelector::BLUE),
        color(Rgba::WHITE, ChannelSelector::ALPHA),
        dest,
    )
}

#[test]
fn all_fallback_sources_pack_to_four_by_four() {
    let comp = compositor(Path::new("."));
    let mut sink = InMemorySink::new();
    let packed = comp.combine(&all_fallback("out.png"), &mut sink).unwrap();

    assert_eq!((packed.width(), packed.height()), (4, 4));
    assert_eq!(packed.encoding, OutputEncoding::Png);
    for px in packed.image.texels() {
        assert_eq!(px[0], 1.0);
        assert_eq!(px[1], 0.0);
        assert_eq!((px[2] * 255.0).round(), 128.0);
        assert_eq!(px[3], 1.0);
    }
}

#[test]
fn single_real_source_sets_the_size_regardless_of_slot() {
    let comp = compositor(Path::new("."));
    for slot in 0..4 {
        let mut req = all_fallback("out.png");
        req.slots[slot].source = solid_image(256, 256, Rgba::WHITE);
        let packed = comp.combine(&req, &mut InMemorySink::new()).unwrap();
        assert_eq!((packed.width(), packed.height()), (256, 256), "slot {slot}");
    }
}

#[test]
fn axes_negotiate_independently() {
    let comp = compositor(Path::new("."));
    let mut req = all_fallback("out.png");
    req.slots[0].source = solid_image(512, 128, Rgba::WHITE);
    req.slots[3].source = solid_image(128, 512, Rgba::WHITE);
    let packed = comp.combine(&req, &mut InMemorySink::new()).unwrap();
    assert_eq!((packed.width(), packed.height()), (128, 128));
}

#[test]
fn red_extraction_and_inversion() {
    let comp = compositor(Path::new("."));
    let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
    let req = CombineRequest::new(
        color(red, ChannelSelector::RED),
        color(red, ChannelSelector::RED.inverted()),
        color(red, ChannelSelector::GREEN.inverted()),
        color(red, ChannelSelector::ALPHA),
        "out.png",
    );
    let packed = comp.combine(&req, &mut InMemorySink::new()).unwrap();
    for px in packed.image.texels() {
        assert_eq!(*px, [1.0, 0.0, 1.0, 1.0]);
    }
}

#[test]
fn luminance_of_white_and_black() {
    let comp = compositor(Path::new("."));
    let req = CombineRequest::new(
        color(Rgba::WHITE, ChannelSelector::LUMINANCE),
        color(Rgba::BLACK, ChannelSelector::LUMINANCE),
        color(Rgba::BLACK, ChannelSelector::from_code(-4)),
        color(Rgba::WHITE, ChannelSelector::from_code(-4)),
        "out.exr",
    );
    let packed = comp.combine(&req, &mut InMemorySink::new()).unwrap();
    for px in packed.image.texels() {
        assert!((px[0] - 1.0).abs() < 1e-6);
        assert_eq!(px[1], 0.0);
        assert!((px[2] - 1.0).abs() < 1e-6);
        assert!(px[3].abs() < 1e-6);
    }
}

#[test]
fn remap_applies_per_channel() {
    let comp = compositor(Path::new("."));
    let req = CombineRequest::new(
        color(Rgba::splat_rgb(0.5), ChannelSelector::RED),
        color(Rgba::splat_rgb(0.5), ChannelSelector::RED),
        color(Rgba::splat_rgb(0.5), ChannelSelector::RED),
        color(Rgba::splat_rgb(0.5), ChannelSelector::RED),
        "out.exr",
    )
    .with_remapping(OutputChannel::G, 0.25, 0.75)
    .with_remapping(OutputChannel::B, 0.5, 1.0)
    .with_remapping(OutputChannel::A, 0.0, 0.25);
    let packed = comp.combine(&req, &mut InMemorySink::new()).unwrap();
    assert_eq!(packed.image.texel(0, 0), [0.5, 0.5, 0.0, 1.0]);
}

#[test]
fn same_request_twice_writes_identical_bytes() {
    let comp = compositor(Path::new("."));
    let mut req = all_fallback("twice.png");
    req.slots[3].source = SourceDescriptor::image(
        SampledImage::from_fn(33, 17, |x, y| {
            Rgba::splat_rgb(((x * 7 + y * 13) % 32) as f32 / 31.0)
        })
        .unwrap(),
    );
    req.slots[3].selector = ChannelSelector::LUMINANCE;

    let mut sink = InMemorySink::new();
    comp.combine(&req, &mut sink).unwrap();
    let first = sink.bytes("twice.png").unwrap().to_vec();
    let packed = comp.combine(&req, &mut sink).unwrap();

    assert_eq!(sink.write_count(), 2);
    assert_eq!(sink.bytes("twice.png").unwrap(), first.as_slice());
    assert_eq!(packed.handle.path(), "twice.png");

    let mut fresh = InMemorySink::new();
    comp.combine(&req, &mut fresh).unwrap();
    assert_eq!(fresh.bytes("twice.png").unwrap(), first.as_slice());
}

#[test]
fn configuration_errors_happen_before_any_write() {
    let comp = compositor(Path::new("."));

    let degenerate = all_fallback("out.png").with_remapping(OutputChannel::B, 0.3, 0.3);
    let mut sink = InMemorySink::new();
    let err = comp.combine(&degenerate, &mut sink).unwrap_err();
    assert!(matches!(err, CombineError::DegenerateRemapRange(_)), "{err}");
    assert!(sink.ops().is_empty());

    let mut bad_selector = all_fallback("out.png");
    bad_selector.slots[1].selector = ChannelSelector::from_code(7);
    let err = comp.combine(&bad_selector, &mut sink).unwrap_err();
    assert!(matches!(err, CombineError::InvalidChannelSelector(_)), "{err}");
    assert!(sink.ops().is_empty());

    let err = comp
        .combine(&all_fallback("out.tga"), &mut sink)
        .unwrap_err();
    assert!(matches!(err, CombineError::EncodingUnsupported(_)), "{err}");
    assert!(sink.ops().is_empty());
}

#[test]
fn exr_requests_linear_block_compressed_import() {
    let comp = compositor(Path::new("."));
    let mut sink = InMemorySink::new();
    let packed = comp.combine(&all_fallback("m/out.exr"), &mut sink).unwrap();
    assert_eq!(packed.encoding, OutputEncoding::Exr);
    assert_eq!(
        packed.import,
        ImportOptions {
            color_managed: false,
            platform_format: Some(PlatformFormat::Bc3)
        }
    );
    assert_eq!(packed.handle, ImageHandle::for_path("m/out.exr"));
    assert_eq!(
        sink.ops(),
        &[
            SinkOp::Write("m/out.exr".into()),
            SinkOp::Import("m/out.exr".into(), packed.import),
            SinkOp::Read("m/out.exr".into()),
        ]
    );
}

#[test]
fn failed_import_deletes_destination() {
    let comp = compositor(Path::new("."));
    let mut sink = InMemorySink::failing_imports();
    let err = comp.combine(&all_fallback("out.png"), &mut sink).unwrap_err();
    assert!(matches!(err, CombineError::PersistenceFailure(_)), "{err}");
    assert!(!sink.contains("out.png"));
    assert_eq!(sink.ops().last(), Some(&SinkOp::Delete("out.png".into())));
}

#[test]
fn checkerboard_end_to_end() {
    let root = temp_dir("checker");
    write_png(&root, "tex/checker.png", 64, 64, |x, y| {
        if ((x / 8) + (y / 8)) % 2 == 0 {
            [255, 255, 255, 255]
        } else {
            [0, 0, 0, 255]
        }
    });

    let comp = compositor(&root);
    let req = CombineRequest::new(
        color(Rgba::WHITE, ChannelSelector::RED),
        color(Rgba::BLACK, ChannelSelector::GREEN),
        color(Rgba::new(0.5, 0.5, 0.5, 0.5), ChannelSelector::ALPHA),
        ChannelSlot::new(
            SourceDescriptor::path("tex/checker.png"),
            ChannelSelector::from_code(-4),
        ),
        "tex/checker_MaskMap.png",
    );
    let mut sink = InMemorySink::new();
    let packed = comp.combine(&req, &mut sink).unwrap();
    assert_eq!((packed.width(), packed.height()), (64, 64));

    let bytes = sink.bytes("tex/checker_MaskMap.png").unwrap();
    let decoded = image::load_from_memory(bytes).unwrap().into_rgba8();
    for (x, y, px) in decoded.enumerate_pixels() {
        let lum: u8 = if ((x / 8) + (y / 8)) % 2 == 0 { 255 } else { 0 };
        assert_eq!(px.0, [255, 0, 128, 255 - lum], "at {x},{y}");
    }

    let stats = comp.resolver().raw_stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.live(), 0);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn source_used_by_several_slots_is_decoded_once() {
    let root = temp_dir("shared_raw");
    write_png(&root, "a.png", 16, 8, |x, _| [x as u8 * 16, 0, 0, 255]);
    let comp = compositor(&root);
    let src = SourceDescriptor::path("a.png");
    let req = CombineRequest::new(
        ChannelSlot::new(src.clone(), ChannelSelector::RED),
        ChannelSlot::new(src.clone(), ChannelSelector::GREEN),
        ChannelSlot::new(src, ChannelSelector::ALPHA),
        color(Rgba::WHITE, ChannelSelector::RED),
        "out.png",
    );
    comp.combine(&req, &mut InMemorySink::new()).unwrap();
    let stats = comp.resolver().raw_stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn raw_duplicates_are_released_when_persistence_fails() {
    let root = temp_dir("raw_release");
    write_png(&root, "a.png", 8, 8, |_, _| [10, 20, 30, 255]);
    write_png(&root, "b.png", 8, 8, |_, _| [40, 50, 60, 255]);
    let comp = compositor(&root);
    let req = CombineRequest::new(
        ChannelSlot::new(SourceDescriptor::path("a.png"), ChannelSelector::RED),
        ChannelSlot::new(SourceDescriptor::path("b.png"), ChannelSelector::RED),
        color(Rgba::WHITE, ChannelSelector::RED),
        color(Rgba::WHITE, ChannelSelector::RED),
        "out.png",
    );
    assert!(
        comp.combine(&req, &mut InMemorySink::failing_imports())
            .is_err()
    );
    let stats = comp.resolver().raw_stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.live(), 0);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn missing_source_is_unavailable_and_writes_nothing() {
    let comp = compositor(&temp_dir("missing"));
    let mut req = all_fallback("out.png");
    req.slots[0].source = SourceDescriptor::path("nope.png");
    let mut sink = InMemorySink::new();
    let err = comp.combine(&req, &mut sink).unwrap_err();
    assert!(matches!(err, CombineError::SourceUnavailable(_)), "{err}");
    assert!(sink.ops().is_empty());
    assert_eq!(comp.resolver().raw_stats().live(), 0);
}

#[test]
fn sequential_and_parallel_assembly_match() {
    let source = SourceDescriptor::image(
        SampledImage::from_fn(97, 61, |x, y| {
            Rgba::new(
                x as f32 / 96.0,
                y as f32 / 60.0,
                ((x ^ y) & 15) as f32 / 15.0,
                0.25 + (x % 3) as f32 * 0.25,
            )
        })
        .unwrap(),
    );
    let small = solid_image(50, 40, Rgba::new(0.2, 0.4, 0.6, 0.8));
    let req = CombineRequest::new(
        ChannelSlot::new(source.clone(), ChannelSelector::LUMINANCE),
        ChannelSlot::new(small, ChannelSelector::BLUE.inverted()),
        ChannelSlot::new(source.clone(), ChannelSelector::ALPHA),
        ChannelSlot::new(source, ChannelSelector::from_code(-2)),
        "par.exr",
    )
    .with_remapping(OutputChannel::R, 0.1, 0.9);

    let resolver = Arc::new(ChannelSourceResolver::new("."));
    let seq = Compositor::new(
        Arc::clone(&resolver),
        CompositorOpts {
            parallel: false,
            threads: None,
        },
    );
    let par = Compositor::new(
        resolver,
        CompositorOpts {
            parallel: true,
            threads: Some(3),
        },
    );

    for filter in [SampleFilter::Bilinear, SampleFilter::Nearest] {
        let req = req.clone().with_filter(filter);
        let a = seq.combine(&req, &mut InMemorySink::new()).unwrap();
        let b = par.combine(&req, &mut InMemorySink::new()).unwrap();
        assert_eq!((a.width(), a.height()), (50, 40));
        assert_eq!(a.image, b.image, "{filter:?}");
    }
}

#[test]
fn zero_threads_is_rejected() {
    let comp = Compositor::new(
        Arc::new(ChannelSourceResolver::new(".")),
        CompositorOpts {
            parallel: true,
            threads: Some(0),
        },
    );
    let mut sink = InMemorySink::new();
    let err = comp.combine(&all_fallback("out.png"), &mut sink).unwrap_err();
    assert!(matches!(err, CombineError::Validation(_)));
    assert!(sink.ops().is_empty());
}
