use super::*;

#[test]
fn hex_parse_accepts_six_and_eight_digits() {
    assert_eq!(
        Rgba8::parse_hex("#FFD700").unwrap(),
        Rgba8::opaque(255, 215, 0)
    );
    assert_eq!(
        Rgba8::parse_hex("c71585").unwrap(),
        Rgba8::opaque(0xc7, 0x15, 0x85)
    );
    assert_eq!(
        Rgba8::parse_hex("#000000ff").unwrap(),
        Rgba8::new(0, 0, 0, 255)
    );
}

#[test]
fn hex_parse_rejects_garbage() {
    assert!(Rgba8::parse_hex("#12345").is_err());
    assert!(Rgba8::parse_hex("#gg0000").is_err());
    assert!(Rgba8::parse_hex("").is_err());
    assert!(Rgba8::parse_hex("#ééé").is_err());
}

#[test]
fn hex_output_drops_opaque_alpha() {
    assert_eq!(Rgba8::opaque(1, 2, 3).to_hex(), "#010203");
    assert_eq!(Rgba8::new(1, 2, 3, 4).to_hex(), "#01020304");
}

#[test]
fn color_serde_uses_hex_strings() {
    let json = serde_json::to_string(&Rgba8::opaque(255, 0, 170)).unwrap();
    assert_eq!(json, "\"#ff00aa\"");
    let back: Rgba8 = serde_json::from_str("\"#FF00AA\"").unwrap();
    assert_eq!(back, Rgba8::opaque(255, 0, 170));
    assert!(serde_json::from_str::<Rgba8>("\"blue\"").is_err());
}

#[test]
fn vector3_serializes_as_xyz_object() {
    let v = Vector3::new(-1.7, 0.0, 2.0);
    let json = serde_json::to_value(v).unwrap();
    assert_eq!(json, serde_json::json!({"x": -1.7, "y": 0.0, "z": 2.0}));
    assert!(v.is_finite());
    assert!(!Vector3::new(f64::NAN, 0.0, 0.0).is_finite());
}
