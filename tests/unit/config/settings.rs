use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn defaults_match_the_shop_layout() {
    let s = ConfiguratorSettings::default();
    assert_eq!(s.record_key, "finalCake");
    assert_eq!(s.model_scale, Vector3::new(2.5, 2.0, 2.5));
    assert_eq!(s.model_offset, Vector3::new(0.0, -2.0, 0.0));
    assert_eq!(s.sprinkle_anchor, Vector3::new(0.0, -1.9, 0.0));
    assert_eq!(s.load_threads, None);
}

#[test]
fn env_overrides_apply_and_bad_values_fall_back() {
    let s = ConfiguratorSettings::default().with_env(env(&[
        ("CAKECRAFT_MODELS_ROOT", "/srv/models"),
        ("CAKECRAFT_LOAD_THREADS", "zero"),
        ("CAKECRAFT_RECORD_KEY", "  "),
        ("CAKECRAFT_DECAL_FONT", "fonts/Bold.ttf"),
    ]));
    assert_eq!(s.models_root, PathBuf::from("/srv/models"));
    assert_eq!(s.load_threads, None);
    assert_eq!(s.record_key, "finalCake");
    assert_eq!(s.decal_font, Some(PathBuf::from("fonts/Bold.ttf")));

    let s = ConfiguratorSettings::default().with_env(env(&[("CAKECRAFT_LOAD_THREADS", "0")]));
    assert_eq!(s.load_threads, None);
    let s = ConfiguratorSettings::default().with_env(env(&[("CAKECRAFT_LOAD_THREADS", "3")]));
    assert_eq!(s.load_threads, Some(3));
}

#[test]
fn partial_json_keeps_defaults_and_rejects_unknown_keys() {
    let s: ConfiguratorSettings =
        serde_json::from_str(r#"{"record_key":"shopCake","model_scale":{"x":1,"y":1,"z":1}}"#)
            .unwrap();
    assert_eq!(s.record_key, "shopCake");
    assert_eq!(s.model_scale, Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(s.models_root, PathBuf::from("models"));

    assert!(serde_json::from_str::<ConfiguratorSettings>(r#"{"colour":"red"}"#).is_err());
}
