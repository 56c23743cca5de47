use super::*;

const BASE: &str = "http://127.0.0.1:8000";

// =============================================================================
// URLS
// =============================================================================

#[test]
fn endpoint_urls() {
    assert_eq!(templates_url(BASE), "http://127.0.0.1:8000/api/templates");
    assert_eq!(template_url(BASE, "abc"), "http://127.0.0.1:8000/api/templates/abc");
    assert_eq!(mapping_url(BASE, "abc"), "http://127.0.0.1:8000/api/templates/abc/mapping");
    assert_eq!(render_url(BASE, "abc"), "http://127.0.0.1:8000/api/render/abc");
    assert_eq!(images_url(BASE), "http://127.0.0.1:8000/api/images");
}

#[test]
fn preview_url_clamps_page_to_one() {
    assert_eq!(preview_url(BASE, "abc", 3), "http://127.0.0.1:8000/api/templates/abc/preview?page=3");
    assert_eq!(preview_url(BASE, "abc", 0), "http://127.0.0.1:8000/api/templates/abc/preview?page=1");
}

#[test]
fn image_url_joins_relative_path() {
    assert_eq!(image_url(BASE, "images/seal.png"), "http://127.0.0.1:8000/api/uploads/images/seal.png");
    assert_eq!(image_url(BASE, "/images/seal.png"), "http://127.0.0.1:8000/api/uploads/images/seal.png");
}

#[test]
fn client_uses_config_base_url() {
    let config = ServiceConfig::default().with_base_url("https://forms.example.test/").unwrap();
    let service = HttpTemplateService::new(&config).unwrap();
    assert_eq!(service.base_url(), "https://forms.example.test");
    assert_eq!(service.image_url("images/a.png"), "https://forms.example.test/api/uploads/images/a.png");
}

// =============================================================================
// STATUS
// =============================================================================

#[test]
fn success_status_passes_body_through() {
    assert_eq!(check_status(200, "ok".into()).unwrap(), "ok");
    assert_eq!(check_status(204, String::new()).unwrap(), "");
}

#[test]
fn not_found_uses_detail_message() {
    let err = check_status(404, r#"{"detail":"Template not found"}"#.into()).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Template not found"));
}

#[test]
fn not_found_without_json_keeps_raw_body() {
    let err = status_error(404, "gone".into());
    assert!(matches!(err, ServiceError::NotFound(msg) if msg == "gone"));
}

#[test]
fn other_failures_keep_status_and_body() {
    let err = check_status(400, r#"{"detail":"Image files only"}"#.into()).unwrap_err();
    let ServiceError::Status { status, body } = err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(status, 400);
    assert!(body.contains("Image files only"));
}

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn parse_template_list_unwraps_envelope() {
    let text = r#"{"templates":[
        {"template_id":"a","filename":"a.pdf","created_at":"2024-01-01","element_count":3},
        {"template_id":"b"}
    ]}"#;
    let list = parse_template_list(text).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].element_count, 3);
    assert_eq!(list[1].filename, "");
}

#[test]
fn parse_template_list_rejects_bare_array() {
    let err = parse_template_list(r#"[{"template_id":"a"}]"#).unwrap_err();
    assert!(matches!(err, ServiceError::Parse(_)));
}

#[test]
fn parse_template_reads_elements() {
    let text = r#"{
        "template_id": "t",
        "elements": [
            {"id":"e1","type":"image","page":1,"bbox":{"x":0,"y":0,"w":50,"h":25},"data_path":"","image_path":"images/s.png"}
        ]
    }"#;
    let template = parse_template(text).unwrap();
    assert_eq!(template.elements.len(), 1);
    assert_eq!(template.elements[0].kind.name(), "image");
}

#[test]
fn parse_template_rejects_unknown_element_type() {
    let text = r#"{"template_id":"t","elements":[{"id":"e","type":"signature","page":1,"bbox":{"x":0,"y":0,"w":1,"h":1}}]}"#;
    assert!(matches!(parse_template(text), Err(ServiceError::Parse(_))));
}

#[test]
fn parse_uploaded_image_reads_path_and_id() {
    let uploaded = parse_uploaded_image(r#"{"image_path":"images/x.png","image_id":"x"}"#).unwrap();
    assert_eq!(uploaded.image_path, "images/x.png");
    assert_eq!(uploaded.image_id.as_deref(), Some("x"));
}
