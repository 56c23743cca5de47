#![allow(clippy::float_cmp)]

use std::sync::Mutex;

use super::*;
use crate::services::{PageInfo, TemplateSummary, UploadedImage};
use canvas::doc::{BoundingBox, Element, ElementId};
use canvas::input::{Button, Tool};
use canvas::transform::{PageSize, Point};
use serde_json::json;

// =============================================================
// Mock service
// =============================================================

#[derive(Default)]
struct MockService {
    template: Option<Template>,
    fail_save: bool,
    fail_upload: bool,
    fail_preview: bool,
    saved: Mutex<Vec<(String, MappingUpdate)>>,
    uploads: Mutex<Vec<ImageUpload>>,
    previews: Mutex<Vec<(String, u32)>>,
    renders: Mutex<Vec<(String, Value)>>,
}

fn unavailable() -> ServiceError {
    ServiceError::Status { status: 503, body: "unavailable".into() }
}

#[async_trait::async_trait]
impl TemplateService for MockService {
    async fn fetch_template(&self, template_id: &str) -> Result<Template, ServiceError> {
        match &self.template {
            Some(template) if template.template_id == template_id => Ok(template.clone()),
            _ => Err(ServiceError::NotFound(template_id.to_string())),
        }
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, ServiceError> {
        Ok(Vec::new())
    }

    async fn save_mapping(&self, template_id: &str, update: &MappingUpdate) -> Result<(), ServiceError> {
        if self.fail_save {
            return Err(unavailable());
        }
        self.saved.lock().unwrap().push((template_id.to_string(), update.clone()));
        Ok(())
    }

    async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage, ServiceError> {
        if self.fail_upload {
            return Err(unavailable());
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(upload);
        Ok(UploadedImage { image_path: format!("images/{}.png", uploads.len()), image_id: None })
    }

    async fn page_preview(&self, template_id: &str, page: u32) -> Result<Vec<u8>, ServiceError> {
        if self.fail_preview {
            return Err(unavailable());
        }
        self.previews.lock().unwrap().push((template_id.to_string(), page));
        Ok(vec![1, 2, 3])
    }

    async fn render(&self, template_id: &str, request: &RenderRequest) -> Result<Vec<u8>, ServiceError> {
        self.renders.lock().unwrap().push((template_id.to_string(), request.to_body()?));
        Ok(b"%PDF-1.7".to_vec())
    }
}

// =============================================================
// Helpers
// =============================================================

const TEMPLATE_ID: &str = "tpl-1";

fn existing_text() -> Element {
    let mut element = Element::text(1, BoundingBox::new(40.0, 40.0, 120.0, 20.0), "customer.name");
    element.id = ElementId::from("elem_existing");
    element
}

fn template() -> Template {
    Template {
        template_id: TEMPLATE_ID.into(),
        filename: "invoice.pdf".into(),
        page_size: None,
        pages: vec![
            PageInfo { page: 1, width_pt: 595.28, height_pt: 841.89, extra: serde_json::Map::new() },
            PageInfo { page: 2, width_pt: 595.28, height_pt: 841.89, extra: serde_json::Map::new() },
        ],
        elements: vec![existing_text()],
        created_at: String::new(),
    }
}

fn service_with(configure: impl FnOnce(&mut MockService)) -> Arc<MockService> {
    let mut service = MockService { template: Some(template()), ..MockService::default() };
    configure(&mut service);
    Arc::new(service)
}

/// Session whose display matches the page, so one pixel is one point.
async fn open(service: &Arc<MockService>) -> EditorSession<MockService> {
    let page = PageSize::A4;
    EditorSession::open(Arc::clone(service), TEMPLATE_ID, page.width, page.height).await.unwrap()
}

fn click(session: &mut EditorSession<MockService>, x: f64, y: f64) -> Vec<Action> {
    let core = session.core_mut();
    let mut actions = core.on_pointer_down(Point::new(x, y), Button::Primary);
    actions.extend(core.on_pointer_up(Point::new(x, y), Button::Primary));
    actions
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Start an image element with a click at (150, 150): a 100pt square at (100, 100).
fn pending_image(session: &mut EditorSession<MockService>) {
    session.core_mut().set_tool(Tool::Image);
    let actions = click(session, 150.0, 150.0);
    assert!(actions.contains(&Action::ImageRequested));
}

// =============================================================
// Open
// =============================================================

#[tokio::test]
async fn open_loads_working_set_and_page_size() {
    let service = service_with(|_| {});
    let session = open(&service).await;

    assert_eq!(session.template().template_id, TEMPLATE_ID);
    assert_eq!(session.page_count(), 2);
    assert_eq!(session.core().elements(), &[existing_text()]);
    assert_eq!(session.core().viewport.page, PageSize::A4);
    assert_eq!(session.core().viewport.display_width, PageSize::A4.width);
    assert_eq!(session.core().page(), 1);
}

#[tokio::test]
async fn open_uses_reported_page_size() {
    let service = service_with(|s| {
        if let Some(template) = s.template.as_mut() {
            template.page_size = Some(PageSize { width: 612.0, height: 792.0 });
        }
    });
    let session = EditorSession::open(Arc::clone(&service), TEMPLATE_ID, 306.0, 396.0).await.unwrap();
    assert_eq!(session.core().viewport.page, PageSize { width: 612.0, height: 792.0 });
    assert_eq!(session.core().viewport.scale_x(), 0.5);
}

#[tokio::test]
async fn open_unknown_template_fails_with_load() {
    let service = service_with(|_| {});
    let result = EditorSession::open(Arc::clone(&service), "missing", 600.0, 849.0).await;
    let Err(SessionError::Load(ServiceError::NotFound(id))) = result else {
        panic!("expected load failure");
    };
    assert_eq!(id, "missing");
}

// =============================================================
// Preview
// =============================================================

#[tokio::test]
async fn preview_requests_page_from_service() {
    let service = service_with(|_| {});
    let session = open(&service).await;
    assert_eq!(session.preview(2).await.unwrap(), vec![1, 2, 3]);
    assert_eq!(*service.previews.lock().unwrap(), vec![(TEMPLATE_ID.to_string(), 2)]);
}

#[tokio::test]
async fn preview_failure_is_reported() {
    let service = service_with(|s| s.fail_preview = true);
    let session = open(&service).await;
    assert!(matches!(session.preview(1).await, Err(SessionError::Preview(_))));
}

// =============================================================
// Save
// =============================================================

#[tokio::test]
async fn save_sends_elements_and_pages() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    session.core_mut().set_tool(Tool::Checkbox);
    session.core_mut().on_pointer_down(Point::new(300.0, 300.0), Button::Primary);
    session.core_mut().on_pointer_move(Point::new(320.0, 310.0));
    session.core_mut().on_pointer_up(Point::new(320.0, 310.0), Button::Primary);
    assert_eq!(session.core().elements().len(), 2);

    session.save().await.unwrap();

    let saved = service.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    let (id, update) = &saved[0];
    assert_eq!(id, TEMPLATE_ID);
    assert_eq!(update.elements.len(), 2);
    assert_eq!(update.pages, template().pages);
    let checkbox = &update.elements[1];
    assert!(checkbox.is_checkbox());
    assert_eq!(checkbox.bbox.w, checkbox.bbox.h);
}

#[tokio::test]
async fn save_snapshots_before_later_edits() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;

    let pending_save = session.save();
    session.core_mut().load_elements(Vec::new());
    pending_save.await.unwrap();

    let saved = service.saved.lock().unwrap();
    assert_eq!(saved[0].1.elements, vec![existing_text()]);
}

#[tokio::test]
async fn save_failure_keeps_working_set() {
    let service = service_with(|s| s.fail_save = true);
    let session = open(&service).await;

    let result = session.save().await;
    assert!(matches!(result, Err(SessionError::Save(ServiceError::Status { status: 503, .. }))));
    assert_eq!(session.core().elements(), &[existing_text()]);
}

// =============================================================
// Image upload
// =============================================================

#[tokio::test]
async fn upload_rescales_pending_image_to_aspect() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    pending_image(&mut session);

    let actions = session.upload_image(png(200, 100), "seal.png").await.unwrap();

    let created = session.core().elements().last().unwrap().clone();
    assert!(actions.contains(&Action::ElementCreated(created.clone())));
    assert_eq!(created.bbox, BoundingBox::new(100.0, 100.0, 100.0, 50.0));
    assert_eq!(created.kind, ElementKind::Image { image_path: "images/1.png".into() });
    assert!(session.core().pending_element().is_none());

    let uploads = service.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].filename, "seal.png");
    assert_eq!(uploads[0].content_type(), "image/png");
}

#[tokio::test]
async fn upload_without_pending_image_is_rejected() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;

    let result = session.upload_image(png(10, 10), "seal.png").await;
    assert!(matches!(result, Err(SessionError::NoPendingImage)));
    assert!(service.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_failure_discards_provisional_element() {
    let service = service_with(|s| s.fail_upload = true);
    let mut session = open(&service).await;
    pending_image(&mut session);

    let result = session.upload_image(png(10, 10), "seal.png").await;
    assert!(matches!(result, Err(SessionError::Upload(_))));
    assert!(session.core().pending_element().is_none());
    assert_eq!(session.core().elements(), &[existing_text()]);
}

#[tokio::test]
async fn undecodable_image_is_not_uploaded() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    pending_image(&mut session);

    let result = session.upload_image(b"not an image".to_vec(), "seal.png").await;
    assert!(matches!(result, Err(SessionError::ImageDecode(_))));
    assert!(service.uploads.lock().unwrap().is_empty());
    assert!(session.core().pending_element().is_none());
}

#[tokio::test]
async fn upload_finishing_after_cancel_is_rejected() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    pending_image(&mut session);

    let upload = session.begin_image_upload(png(40, 80), "seal.png").unwrap();
    session.core_mut().cancel_metadata();
    let result = session.finish_image_upload(upload.await);

    assert!(matches!(result, Err(SessionError::NoPendingImage)));
    assert_eq!(session.core().elements(), &[existing_text()]);
}

#[tokio::test]
async fn begin_upload_without_pending_image_is_rejected() {
    let service = service_with(|_| {});
    let session = open(&service).await;
    assert!(matches!(session.begin_image_upload(png(10, 10), "seal.png"), Err(SessionError::NoPendingImage)));
}

/// Start a second image element at (400, 400): a 100pt square at (350, 350).
fn replace_pending_image(session: &mut EditorSession<MockService>) -> ElementId {
    session.core_mut().cancel_metadata();
    session.core_mut().set_tool(Tool::Image);
    click(session, 400.0, 400.0);
    session.core().pending_element().unwrap().id.clone()
}

#[tokio::test]
async fn late_upload_does_not_fill_a_newer_image_element() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    pending_image(&mut session);

    let upload = session.begin_image_upload(png(40, 80), "seal.png").unwrap();
    let newer = replace_pending_image(&mut session);
    let result = session.finish_image_upload(upload.await);

    assert!(matches!(result, Err(SessionError::NoPendingImage)));
    assert_eq!(session.core().elements(), &[existing_text()]);
    let pending = session.core().pending_element().unwrap();
    assert_eq!(pending.id, newer);
    assert_eq!(pending.bbox, BoundingBox::new(350.0, 350.0, 100.0, 100.0));
    assert_eq!(pending.kind, ElementKind::Image { image_path: String::new() });

    let actions = session.upload_image(png(100, 100), "logo.png").await.unwrap();
    let created = session.core().elements().last().unwrap();
    assert_eq!(created.id, newer);
    assert_eq!(created.kind, ElementKind::Image { image_path: "images/2.png".into() });
    assert!(actions.contains(&Action::ElementCreated(created.clone())));
}

#[tokio::test]
async fn late_upload_failure_keeps_a_newer_image_element() {
    let service = service_with(|s| s.fail_upload = true);
    let mut session = open(&service).await;
    pending_image(&mut session);

    let upload = session.begin_image_upload(png(40, 80), "seal.png").unwrap();
    let newer = replace_pending_image(&mut session);
    let result = session.finish_image_upload(upload.await);

    assert!(matches!(result, Err(SessionError::Upload(_))));
    assert_eq!(session.core().pending_element().map(|e| e.id.clone()), Some(newer));
}

// =============================================================
// Test render / example payload
// =============================================================

#[tokio::test]
async fn test_render_overrides_elements_with_working_set() {
    let service = service_with(|_| {});
    let mut session = open(&service).await;
    session.core_mut().load_elements(Vec::new());

    let bytes = session.test_render(json!({ "customer": { "name": "Ada" } })).await.unwrap();
    assert_eq!(bytes, b"%PDF-1.7");

    let renders = service.renders.lock().unwrap();
    let (id, body) = &renders[0];
    assert_eq!(id, TEMPLATE_ID);
    assert_eq!(body["customer"]["name"], json!("Ada"));
    assert_eq!(body["_elements"], json!([]));
}

#[tokio::test]
async fn test_render_rejects_non_object_payload() {
    let service = service_with(|_| {});
    let session = open(&service).await;

    let result = session.test_render(json!(["not", "an", "object"])).await;
    assert!(matches!(result, Err(SessionError::Render(ServiceError::InvalidPayload(_)))));
    assert!(service.renders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn example_payload_covers_working_set() {
    let service = service_with(|_| {});
    let session = open(&service).await;
    assert_eq!(session.example_payload(), json!({ "customer": { "name": "John Doe" } }));
}
