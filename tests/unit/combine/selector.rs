use super::*;

#[test]
fn codes_map_to_extractions() {
    assert_eq!(ChannelSelector::from_code(0).validate().unwrap(), Extraction::Red);
    assert_eq!(ChannelSelector::from_code(3).validate().unwrap(), Extraction::Alpha);
    assert_eq!(
        ChannelSelector::from_code(4).validate().unwrap(),
        Extraction::Luminance
    );

    let inv = ChannelSelector::from_code(-4);
    assert!(inv.is_inverted());
    assert_eq!(inv.validate().unwrap(), Extraction::Luminance);
    assert_eq!(inv.code(), -4);
}

#[test]
fn unmapped_magnitudes_are_rejected() {
    for code in [5, -5, 42, i32::MIN] {
        let err = ChannelSelector::from_code(code).validate().unwrap_err();
        assert!(matches!(err, CombineError::InvalidChannelSelector(_)), "{code}");
    }
}

#[test]
fn red_of_red_and_inverted() {
    let red = [1.0, 0.0, 0.0, 1.0];
    assert_eq!(ChannelSelector::RED.compile().unwrap().apply(red), 1.0);
    assert_eq!(ChannelSelector::RED.inverted().compile().unwrap().apply(red), 0.0);
    assert_eq!(ChannelSelector::RED.inverted().code(), 0);
}

#[test]
fn luminance_of_white_and_black() {
    let lum = ChannelSelector::LUMINANCE.compile().unwrap();
    assert!((lum.apply([1.0, 1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
    assert_eq!(lum.apply([0.0, 0.0, 0.0, 1.0]), 0.0);
    assert!((lum.apply([0.0, 1.0, 0.0, 0.0]) - 0.587).abs() < 1e-6);
}

#[test]
fn serde_uses_signed_code() {
    let sel: ChannelSelector = serde_json::from_str("-4").unwrap();
    assert_eq!(sel, ChannelSelector::LUMINANCE.inverted());
    assert_eq!(serde_json::to_string(&ChannelSelector::ALPHA).unwrap(), "3");
}
