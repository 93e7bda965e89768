use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LayercraftError::remote_service("x")
            .to_string()
            .contains("remote service error:")
    );
    assert!(
        LayercraftError::schema_violation("x")
            .to_string()
            .contains("schema violation:")
    );
    assert!(
        LayercraftError::empty_result("x")
            .to_string()
            .contains("empty result:")
    );
    assert!(
        LayercraftError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(
        LayercraftError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LayercraftError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_remote_and_empty_results_are_retriable() {
    assert!(LayercraftError::remote_service("down").is_retriable());
    assert!(LayercraftError::empty_result("no image").is_retriable());
    assert!(!LayercraftError::schema_violation("bad").is_retriable());
    assert!(!LayercraftError::decode("bad").is_retriable());
    assert!(!LayercraftError::validation("bad").is_retriable());
}
