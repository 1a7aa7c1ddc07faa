use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CakeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(CakeError::asset("x").to_string().contains("asset error:"));
    assert!(CakeError::render("x").to_string().contains("render error:"));
    assert!(
        CakeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert_eq!(CakeError::Cancelled.to_string(), "load cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CakeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_map_to_serde_variant() {
    let err: CakeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, CakeError::Serde(_)));
}
