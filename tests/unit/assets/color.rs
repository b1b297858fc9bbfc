use super::*;
use serde_json::json;

#[test]
fn parses_hex_rgb_and_rgba() {
    let c: ColorDef = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, ColorDef::rgba(1.0, 0.0, 0.0, 1.0));

    let c: ColorDef = serde_json::from_value(json!("#0000ff80")).unwrap();
    assert!((c.b - 1.0).abs() < 1e-9);
    assert!((c.a - (128.0 / 255.0)).abs() < 1e-9);

    assert!(ColorDef::parse_hex("#12345").is_err());
    assert!(ColorDef::parse_hex("#gg0000").is_err());
}

#[test]
fn parses_rgba_object_and_array() {
    let c: ColorDef = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
    assert_eq!(c, ColorDef::rgba(0.25, 0.5, 0.75, 1.0));

    let c: ColorDef = serde_json::from_value(json!([0.25, 0.5, 0.75, 0.9])).unwrap();
    assert_eq!(c, ColorDef::rgba(0.25, 0.5, 0.75, 0.9));

    assert!(serde_json::from_value::<ColorDef>(json!([0.1, 0.2])).is_err());
}

#[test]
fn bare_number_is_an_opaque_grey_level() {
    let c: ColorDef = serde_json::from_value(json!(0.5)).unwrap();
    assert_eq!(c, ColorDef::rgba(0.5, 0.5, 0.5, 1.0));

    let c: ColorDef = serde_json::from_value(json!(1)).unwrap();
    assert_eq!(c.to_rgba(), Rgba::WHITE);
}

#[test]
fn hue_objects_are_not_colors() {
    assert!(serde_json::from_value::<ColorDef>(json!({"h": 0.0, "s": 1.0, "l": 0.5})).is_err());
}

#[test]
fn hex_errors_name_the_input() {
    let err = ColorDef::parse_hex("#+f0000").unwrap_err();
    assert!(err.contains("'#+f0000'"), "{err}");
    assert!(ColorDef::parse_hex("ffffff").is_ok());
    assert!(ColorDef::parse_hex("#ffé000").is_err());
}

#[test]
fn converts_to_float_rgba_without_color_management() {
    let c = ColorDef::parse_hex("#808080").unwrap().to_rgba();
    assert!((c.r - 128.0 / 255.0).abs() < 1e-6);
    assert_eq!(c.a, 1.0);
}
