use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_environment_is_empty() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert!(cfg.api_key.is_none());
    assert_eq!(cfg.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
}

#[test]
fn api_key_falls_back_to_gemini_variable() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "g-key")])).unwrap();
    assert_eq!(cfg.api_key.as_deref(), Some("g-key"));

    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("GEMINI_API_KEY", "g-key"),
        ("LAYERCRAFT_API_KEY", "l-key"),
    ]))
    .unwrap();
    assert_eq!(cfg.api_key.as_deref(), Some("l-key"));
}

#[test]
fn overrides_are_applied_and_url_is_trimmed() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("LAYERCRAFT_API_URL", "http://localhost:9000/v1/"),
        ("LAYERCRAFT_ANALYSIS_MODEL", "vision-small"),
        ("LAYERCRAFT_EXTRACTION_MODEL", "cutter"),
        ("LAYERCRAFT_TIMEOUT_MS", "2500"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "http://localhost:9000/v1");
    assert_eq!(cfg.analysis_model, "vision-small");
    assert_eq!(cfg.extraction_model, "cutter");
    assert_eq!(cfg.timeout, Duration::from_millis(2500));
}

#[test]
fn bad_timeouts_are_rejected() {
    assert!(matches!(
        ClientConfig::from_lookup(lookup_from(&[("LAYERCRAFT_TIMEOUT_MS", "soon")])),
        Err(LayercraftError::Validation(_))
    ));
    assert!(matches!(
        ClientConfig::from_lookup(lookup_from(&[("LAYERCRAFT_TIMEOUT_MS", "0")])),
        Err(LayercraftError::Validation(_))
    ));
}
