use super::*;

#[test]
fn http_client_requires_an_api_key() {
    let err = HttpModelClient::new(&ClientConfig::default()).unwrap_err();
    assert!(matches!(err, LayercraftError::Validation(_)));
}

#[test]
fn endpoint_joins_base_url_and_model() {
    let cfg = ClientConfig {
        api_key: Some("k".to_owned()),
        base_url: "http://localhost:8080/v1beta/".to_owned(),
        ..ClientConfig::default()
    };
    let client = HttpModelClient::new(&cfg).unwrap();
    assert_eq!(
        client.endpoint("gemini-2.5-flash"),
        "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
    );
}

#[test]
fn unreachable_host_is_a_remote_service_error() {
    let cfg = ClientConfig {
        api_key: Some("k".to_owned()),
        base_url: "http://127.0.0.1:9".to_owned(),
        timeout: std::time::Duration::from_millis(500),
        ..ClientConfig::default()
    };
    let client = HttpModelClient::new(&cfg).unwrap();
    let err = client
        .generate("m", &GenerateContentRequest::default())
        .unwrap_err();
    assert!(matches!(err, LayercraftError::RemoteService(_)));
    assert!(err.is_retriable());
}

#[test]
fn truncate_respects_char_boundaries() {
    assert_eq!(truncate("héllo", 2), "hé...");
    assert_eq!(truncate("ok", 10), "ok");
}
