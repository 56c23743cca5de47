//! Wire types shared by every `TemplateService` implementation.

use canvas::doc::Element;
use canvas::transform::PageSize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body key carrying an element list that overrides the stored one for a single render.
pub const ELEMENTS_OVERRIDE_KEY: &str = "_elements";

// =============================================================================
// ERRORS
// =============================================================================

/// Errors produced by template service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The requested template does not exist.
    #[error("template not found: {0}")]
    NotFound(String),

    /// A request payload was rejected before sending.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Per-page geometry reported by the service. Unknown fields round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    #[serde(default)]
    pub width_pt: f64,
    #[serde(default)]
    pub height_pt: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A stored template with its field elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub page_size: Option<PageSize>,
    #[serde(default)]
    pub pages: Vec<PageInfo>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub created_at: String,
}

impl Template {
    /// Page size to edit against; A4 when the service reported none.
    #[must_use]
    pub fn page_size_or_default(&self) -> PageSize {
        self.page_size.unwrap_or_default().sanitized()
    }

    /// Number of pages, never less than one.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.pages.iter().map(|p| p.page).max().unwrap_or(1).max(1)
    }
}

/// Listing entry returned by `list_templates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub template_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub element_count: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateList {
    pub templates: Vec<TemplateSummary>,
}

/// Body of a mapping save: the full working set plus the page records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingUpdate {
    pub elements: Vec<Element>,
    pub pages: Vec<PageInfo>,
}

// =============================================================================
// IMAGES
// =============================================================================

/// Raw image bytes to store on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl ImageUpload {
    #[must_use]
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self { bytes, filename: filename.into() }
    }

    /// MIME type sniffed from the bytes, falling back to the file extension.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .or_else(|_| image::ImageFormat::from_path(&self.filename))
            .map_or("application/octet-stream", |format| format.to_mime_type())
    }
}

/// Where the service stored an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Path relative to the service's upload root, e.g. `images/<id>.png`.
    pub image_path: String,
    #[serde(default)]
    pub image_id: Option<String>,
}

// =============================================================================
// RENDERING
// =============================================================================

/// Data payload for a document render, optionally with an unsaved element list.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    data: Map<String, Value>,
    elements: Option<Vec<Element>>,
}

impl RenderRequest {
    /// Wrap a data payload. Only JSON objects are accepted, and the override key is reserved.
    pub fn new(data: Value) -> Result<Self, ServiceError> {
        let data = match data {
            Value::Object(data) => data,
            other => {
                return Err(ServiceError::InvalidPayload(format!(
                    "render data must be a JSON object, got {}",
                    kind_of(&other)
                )));
            }
        };
        if data.contains_key(ELEMENTS_OVERRIDE_KEY) {
            return Err(ServiceError::InvalidPayload(format!("`{ELEMENTS_OVERRIDE_KEY}` is a reserved key")));
        }
        Ok(Self { data, elements: None })
    }

    /// Render with these elements instead of the saved mapping.
    #[must_use]
    pub fn with_elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = Some(elements);
        self
    }

    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    #[must_use]
    pub fn elements(&self) -> Option<&[Element]> {
        self.elements.as_deref()
    }

    /// The request body: the data object plus `_elements` when overriding.
    pub fn to_body(&self) -> Result<Value, ServiceError> {
        let mut body = self.data.clone();
        if let Some(elements) = &self.elements {
            let elements = serde_json::to_value(elements).map_err(|e| ServiceError::InvalidPayload(e.to_string()))?;
            body.insert(ELEMENTS_OVERRIDE_KEY.to_string(), elements);
        }
        Ok(Value::Object(body))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
