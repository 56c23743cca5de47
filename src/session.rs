//! Editing session: one template bound to one editor core.
//!
//! The session loads a template into an [`EngineCore`], keeps the working set
//! there, and talks to the [`TemplateService`] for previews, saves, image
//! uploads and test renders. Network calls that may overlap with further
//! editing (`save`, `begin_image_upload`) snapshot what they need and return
//! `'static` futures, so the caller keeps driving the engine while they run.

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use canvas::data_path;
use canvas::doc::{ElementId, ElementKind};
use canvas::engine::{Action, EngineCore};
use serde_json::Value;

use crate::services::{ImageUpload, MappingUpdate, RenderRequest, ServiceError, Template, TemplateService};

/// Errors surfaced to the action that initiated them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The template could not be loaded; no session exists.
    #[error("template load failed: {0}")]
    Load(#[source] ServiceError),

    #[error("page preview failed: {0}")]
    Preview(#[source] ServiceError),

    /// The mapping was not saved; the working set is unchanged.
    #[error("save failed: {0}")]
    Save(#[source] ServiceError),

    /// The image was not stored; the provisional image element is discarded.
    #[error("image upload failed: {0}")]
    Upload(#[source] ServiceError),

    #[error("test render failed: {0}")]
    Render(#[source] ServiceError),

    #[error("no image element is waiting for an upload")]
    NoPendingImage,

    #[error("image decode failed: {0}")]
    ImageDecode(String),
}

/// An uploaded image with its decoded pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub image_path: String,
    pub width: u32,
    pub height: u32,
}

/// Result of an upload started by [`EditorSession::begin_image_upload`],
/// tied to the image element it was started for.
#[derive(Debug)]
pub struct ImageUploadOutcome {
    pub element_id: ElementId,
    pub result: Result<StoredImage, SessionError>,
}

pub struct EditorSession<S> {
    service: Arc<S>,
    template: Template,
    core: EngineCore,
}

impl<S: TemplateService + 'static> EditorSession<S> {
    /// Load a template and prepare the editor for a raster of the given display size.
    ///
    /// # Errors
    ///
    /// [`SessionError::Load`] when the template cannot be fetched.
    pub async fn open(
        service: Arc<S>,
        template_id: &str,
        display_width: f64,
        display_height: f64,
    ) -> Result<Self, SessionError> {
        let template = service.fetch_template(template_id).await.map_err(|e| {
            tracing::error!(template_id, error = %e, "template load failed");
            SessionError::Load(e)
        })?;

        let mut core = EngineCore::new();
        core.set_page_size(template.page_size_or_default());
        core.set_viewport(display_width, display_height);
        core.load_elements(template.elements.clone());

        tracing::info!(
            template_id,
            pages = template.page_count(),
            elements = template.elements.len(),
            "template opened"
        );
        Ok(Self { service, template, core })
    }

    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    #[must_use]
    pub fn core(&self) -> &EngineCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.template.page_count()
    }

    /// Raster of one page of the template.
    ///
    /// # Errors
    ///
    /// [`SessionError::Preview`] when the service cannot render the page.
    pub async fn preview(&self, page: u32) -> Result<Vec<u8>, SessionError> {
        let template_id = self.template.template_id.as_str();
        self.service.page_preview(template_id, page).await.map_err(|e| {
            tracing::warn!(template_id, page, error = %e, "page preview failed");
            SessionError::Preview(e)
        })
    }

    /// Persist the working set and page records.
    ///
    /// The mapping is snapshotted now; later edits do not affect this save.
    pub fn save(&self) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let service = Arc::clone(&self.service);
        let template_id = self.template.template_id.clone();
        let update = MappingUpdate { elements: self.core.doc.to_vec(), pages: self.template.pages.clone() };
        async move {
            match service.save_mapping(&template_id, &update).await {
                Ok(()) => {
                    tracing::info!(template_id = %template_id, elements = update.elements.len(), "mapping saved");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(template_id = %template_id, error = %e, "mapping save failed");
                    Err(SessionError::Save(e))
                }
            }
        }
    }

    /// Decode the image size and upload the bytes for the pending image element.
    /// Pair with [`Self::finish_image_upload`].
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPendingImage`] when no image element is waiting.
    pub fn begin_image_upload(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<impl Future<Output = ImageUploadOutcome> + Send + 'static, SessionError> {
        let element_id = self.pending_image_id().cloned().ok_or(SessionError::NoPendingImage)?;
        let service = Arc::clone(&self.service);
        let filename = filename.into();
        Ok(async move {
            let result = store_image(service.as_ref(), bytes, filename).await;
            ImageUploadOutcome { element_id, result }
        })
    }

    /// Apply an upload outcome to the image element that started it.
    ///
    /// On success the element is rescaled to the image's aspect ratio and
    /// appended. On failure the provisional element is discarded and the
    /// error is handed back. Outcomes for any other element leave the editor
    /// untouched.
    ///
    /// # Errors
    ///
    /// The upload's own error, or [`SessionError::NoPendingImage`] when the
    /// element was cancelled while the upload ran, even if another image
    /// element is pending now. In that case the image stays stored on the
    /// service, unreferenced.
    pub fn finish_image_upload(&mut self, outcome: ImageUploadOutcome) -> Result<Vec<Action>, SessionError> {
        let ImageUploadOutcome { element_id, result } = outcome;
        let still_pending = self.pending_image_id() == Some(&element_id);
        match result {
            Err(e) => {
                if still_pending {
                    tracing::warn!(id = %element_id, error = %e, "discarding pending image element");
                    self.core.cancel_metadata();
                }
                Err(e)
            }
            Ok(stored) if !still_pending => {
                tracing::warn!(
                    id = %element_id,
                    image_path = %stored.image_path,
                    "upload finished after its image element was cancelled"
                );
                Err(SessionError::NoPendingImage)
            }
            Ok(stored) => Ok(self.core.submit_image(&stored.image_path, f64::from(stored.width), f64::from(stored.height))),
        }
    }

    /// Upload an image for the pending image element and apply the result.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPendingImage`] without a pending image element;
    /// otherwise decode and upload failures, after which the provisional
    /// element is gone.
    pub async fn upload_image(&mut self, bytes: Vec<u8>, filename: impl Into<String>) -> Result<Vec<Action>, SessionError> {
        let outcome = self.begin_image_upload(bytes, filename)?.await;
        self.finish_image_upload(outcome)
    }

    /// Render a document from `data` using the unsaved working set.
    ///
    /// # Errors
    ///
    /// [`SessionError::Render`], including for a non-object payload.
    pub async fn test_render(&self, data: Value) -> Result<Vec<u8>, SessionError> {
        let template_id = self.template.template_id.as_str();
        let request = RenderRequest::new(data).map_err(SessionError::Render)?.with_elements(self.core.doc.to_vec());
        let bytes = self.service.render(template_id, &request).await.map_err(|e| {
            tracing::warn!(template_id, error = %e, "test render failed");
            SessionError::Render(e)
        })?;
        tracing::debug!(template_id, size = bytes.len(), "test render complete");
        Ok(bytes)
    }

    /// Example data payload covering every bound element of the working set.
    #[must_use]
    pub fn example_payload(&self) -> Value {
        data_path::example_payload(self.core.elements())
    }

    fn pending_image_id(&self) -> Option<&ElementId> {
        self.core
            .pending_element()
            .filter(|e| matches!(e.kind, ElementKind::Image { .. }))
            .map(|e| &e.id)
    }
}

async fn store_image<S: TemplateService + ?Sized>(
    service: &S,
    bytes: Vec<u8>,
    filename: String,
) -> Result<StoredImage, SessionError> {
    let (width, height) = image_dimensions(&bytes)?;
    let uploaded = service.upload_image(ImageUpload::new(bytes, filename)).await.map_err(SessionError::Upload)?;
    Ok(StoredImage { image_path: uploaded.image_path, width, height })
}

/// Pixel size of an encoded image, read from its header.
fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), SessionError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SessionError::ImageDecode(e.to_string()))?;
    let (width, height) = reader.into_dimensions().map_err(|e| SessionError::ImageDecode(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(SessionError::ImageDecode(format!("empty image {width}x{height}")));
    }
    Ok((width, height))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
