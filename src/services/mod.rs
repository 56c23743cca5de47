//! Template service: the collaborator that stores templates and renders documents.
//!
//! DESIGN
//! ======
//! Everything outside the editor (template storage, page rasterizing, image
//! storage, document stamping) sits behind [`TemplateService`]. The session
//! and the CLI only see the trait, so tests drive them with an in-memory mock
//! and production uses [`http::HttpTemplateService`].

pub mod http;
pub mod types;

pub use types::{
    ImageUpload, MappingUpdate, PageInfo, RenderRequest, ServiceError, Template, TemplateSummary, UploadedImage,
};

/// Async access to the template service. Enables mocking in tests.
#[async_trait::async_trait]
pub trait TemplateService: Send + Sync {
    /// Fetch one template with its pages and saved elements.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown id, otherwise transport,
    /// status or parse failures.
    async fn fetch_template(&self, template_id: &str) -> Result<Template, ServiceError>;

    /// List every stored template.
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, ServiceError>;

    /// Replace a template's saved element list and page records.
    async fn save_mapping(&self, template_id: &str, update: &MappingUpdate) -> Result<(), ServiceError>;

    /// Store an image and return where it was stored.
    async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage, ServiceError>;

    /// Rasterize one 1-based page of a template to PNG bytes.
    async fn page_preview(&self, template_id: &str, page: u32) -> Result<Vec<u8>, ServiceError>;

    /// Stamp a data payload onto a template and return the document bytes.
    async fn render(&self, template_id: &str, request: &RenderRequest) -> Result<Vec<u8>, ServiceError>;
}
