use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CombineError::source_unavailable("x")
            .to_string()
            .contains("source unavailable:")
    );
    assert!(
        CombineError::invalid_selector("x")
            .to_string()
            .contains("invalid channel selector:")
    );
    assert!(
        CombineError::degenerate_remap("x")
            .to_string()
            .contains("degenerate remap range:")
    );
    assert!(
        CombineError::encoding_unsupported("x")
            .to_string()
            .contains("encoding unsupported:")
    );
    assert!(
        CombineError::persistence("x")
            .to_string()
            .contains("persistence failure:")
    );
    assert!(
        CombineError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CombineError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
