//! HTTP client for the template service.
//!
//! Thin `reqwest` wrapper over the service's JSON API. URL building and body
//! parsing are pure functions for testability.

use std::time::Duration;

use super::TemplateService;
use super::types::{
    ImageUpload, MappingUpdate, RenderRequest, ServiceError, Template, TemplateList, TemplateSummary, UploadedImage,
};
use crate::config::ServiceConfig;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpTemplateService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTemplateService {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ServiceError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of a stored image, for hosts that load image elements.
    #[must_use]
    pub fn image_url(&self, image_path: &str) -> String {
        image_url(&self.base_url, image_path)
    }
}

#[async_trait::async_trait]
impl TemplateService for HttpTemplateService {
    async fn fetch_template(&self, template_id: &str) -> Result<Template, ServiceError> {
        let text = send_text(self.http.get(template_url(&self.base_url, template_id))).await?;
        parse_template(&text)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, ServiceError> {
        let text = send_text(self.http.get(templates_url(&self.base_url))).await?;
        parse_template_list(&text)
    }

    async fn save_mapping(&self, template_id: &str, update: &MappingUpdate) -> Result<(), ServiceError> {
        let request = self.http.put(mapping_url(&self.base_url, template_id)).json(update);
        send_text(request).await?;
        tracing::info!(template_id, elements = update.elements.len(), "mapping saved");
        Ok(())
    }

    async fn upload_image(&self, upload: ImageUpload) -> Result<UploadedImage, ServiceError> {
        let content_type = upload.content_type();
        let size = upload.bytes.len();
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(content_type)
            .map_err(|e| ServiceError::InvalidPayload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let text = send_text(self.http.post(images_url(&self.base_url)).multipart(form)).await?;
        let uploaded = parse_uploaded_image(&text)?;
        tracing::info!(image_path = %uploaded.image_path, size, "image uploaded");
        Ok(uploaded)
    }

    async fn page_preview(&self, template_id: &str, page: u32) -> Result<Vec<u8>, ServiceError> {
        send_bytes(self.http.get(preview_url(&self.base_url, template_id, page))).await
    }

    async fn render(&self, template_id: &str, request: &RenderRequest) -> Result<Vec<u8>, ServiceError> {
        let body = request.to_body()?;
        send_bytes(self.http.post(render_url(&self.base_url, template_id)).json(&body)).await
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

async fn send_text(request: reqwest::RequestBuilder) -> Result<String, ServiceError> {
    let response = request.send().await.map_err(|e| ServiceError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| ServiceError::Request(e.to_string()))?;
    check_status(status, text)
}

async fn send_bytes(request: reqwest::RequestBuilder) -> Result<Vec<u8>, ServiceError> {
    let response = request.send().await.map_err(|e| ServiceError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().await.map_err(|e| ServiceError::Request(e.to_string()))?;
        return Err(status_error(status, body));
    }
    let bytes = response.bytes().await.map_err(|e| ServiceError::Request(e.to_string()))?;
    Ok(bytes.to_vec())
}

// =============================================================================
// URLS
// =============================================================================

fn templates_url(base: &str) -> String {
    format!("{base}/api/templates")
}

fn template_url(base: &str, template_id: &str) -> String {
    format!("{base}/api/templates/{template_id}")
}

fn mapping_url(base: &str, template_id: &str) -> String {
    format!("{base}/api/templates/{template_id}/mapping")
}

fn preview_url(base: &str, template_id: &str, page: u32) -> String {
    format!("{base}/api/templates/{template_id}/preview?page={}", page.max(1))
}

fn render_url(base: &str, template_id: &str) -> String {
    format!("{base}/api/render/{template_id}")
}

fn images_url(base: &str) -> String {
    format!("{base}/api/images")
}

fn image_url(base: &str, image_path: &str) -> String {
    format!("{base}/api/uploads/{}", image_path.trim_start_matches('/'))
}

// =============================================================================
// PARSING
// =============================================================================

fn check_status(status: u16, body: String) -> Result<String, ServiceError> {
    if (200..300).contains(&status) { Ok(body) } else { Err(status_error(status, body)) }
}

fn status_error(status: u16, body: String) -> ServiceError {
    if status == 404 {
        return ServiceError::NotFound(error_detail(&body).unwrap_or(body));
    }
    ServiceError::Status { status, body }
}

/// The `detail` message of a JSON error body, if there is one.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

fn parse_template(text: &str) -> Result<Template, ServiceError> {
    serde_json::from_str(text).map_err(|e| ServiceError::Parse(e.to_string()))
}

fn parse_template_list(text: &str) -> Result<Vec<TemplateSummary>, ServiceError> {
    let list: TemplateList = serde_json::from_str(text).map_err(|e| ServiceError::Parse(e.to_string()))?;
    Ok(list.templates)
}

fn parse_uploaded_image(text: &str) -> Result<UploadedImage, ServiceError> {
    serde_json::from_str(text).map_err(|e| ServiceError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
