use axum::{
    Json,
    extract::{
        FromRequest, Multipart, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
};
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{AppError, FieldError};

/// UploadedFile
///
/// The file part of a multipart submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// FormPayload
///
/// Body extractor for the content routes. Accepts either a JSON object or a
/// `multipart/form-data` submission; in the multipart case the file part is the
/// field named `image` (or any part carrying a filename) and every other part is
/// read as text.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: FormFields,
    pub image: Option<UploadedFile>,
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(multipart_rejection)?;
            return read_multipart(multipart).await;
        }

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        match value {
            Value::Object(map) => Ok(FormPayload {
                fields: FormFields(map),
                image: None,
            }),
            _ => Err(AppError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormPayload, AppError> {
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if name == "image" || file_name.is_some() {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty part for an untouched file input.
            if bytes.is_empty() {
                continue;
            }
            image = Some(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else if !name.is_empty() {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok(FormPayload {
        fields: FormFields(fields),
        image,
    })
}

fn multipart_rejection(rejection: MultipartRejection) -> AppError {
    match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
        _ => AppError::BadRequest(rejection.body_text()),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
        _ => AppError::BadRequest(format!("Malformed multipart body: {}", err.body_text())),
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
        _ => AppError::BadRequest(rejection.body_text()),
    }
}

/// ListField
///
/// Outcome of reading a list-valued field.
#[derive(Debug, Clone, PartialEq)]
pub enum ListField {
    Absent,
    Parsed(Vec<String>),
    // Present but not decodable as a list.
    Malformed,
}

impl ListField {
    /// Decorative lists fall back to empty when they cannot be decoded.
    pub fn or_empty(self) -> Option<Vec<String>> {
        match self {
            ListField::Absent => None,
            ListField::Parsed(items) => Some(items),
            ListField::Malformed => Some(vec![]),
        }
    }
}

/// FormFields
///
/// Typed, lenient access to submitted fields. Multipart sends every value as a
/// string, so booleans, numbers and lists are also accepted in string form.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormFields(pub Map<String, Value>);

impl FormFields {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Trimmed text value. `null` reads as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Value of a clearable optional field. Absent is `None`; `null`, an empty
    /// string or the literal `"null"` is `Some(None)`.
    pub fn optional_text(&self, name: &str) -> Option<Option<String>> {
        let value = self.0.get(name)?;
        if value.is_null() {
            return Some(None);
        }
        match self.text(name) {
            Some(s) if s.is_empty() || s == "null" => Some(None),
            Some(s) => Some(Some(s)),
            None => Some(None),
        }
    }

    pub fn flag(&self, name: &str) -> Result<Option<bool>, FieldError> {
        let Some(value) = self.0.get(name) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(n.as_i64() != Some(0))),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" | "null" => Ok(None),
                "true" | "1" | "on" | "yes" => Ok(Some(true)),
                "false" | "0" | "off" | "no" => Ok(Some(false)),
                _ => Err(FieldError::new(name, format!("{name} must be true or false"))),
            },
            _ => Err(FieldError::new(name, format!("{name} must be true or false"))),
        }
    }

    /// list
    ///
    /// Accepts a JSON array or a JSON-encoded array string. Blank entries are
    /// dropped; `null` or a blank string is an empty list.
    pub fn list(&self, name: &str) -> ListField {
        let Some(value) = self.0.get(name) else {
            return ListField::Absent;
        };

        let items = match value {
            Value::Null => return ListField::Parsed(vec![]),
            Value::Array(items) => items.clone(),
            Value::String(raw) => {
                let raw = raw.trim();
                if raw.is_empty() || raw == "null" {
                    return ListField::Parsed(vec![]);
                }
                match serde_json::from_str::<Vec<Value>>(raw) {
                    Ok(items) => items,
                    Err(_) => return ListField::Malformed,
                }
            }
            _ => return ListField::Malformed,
        };

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) if s.trim().is_empty() => {}
                Value::String(s) => out.push(s.trim().to_string()),
                Value::Number(n) => out.push(n.to_string()),
                _ => return ListField::Malformed,
            }
        }
        ListField::Parsed(out)
    }

    /// A `YYYY-MM-DD` date.
    pub fn date(&self, name: &str) -> Result<Option<NaiveDate>, FieldError> {
        match self.text(name) {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| FieldError::new(name, format!("{name} must be a date (YYYY-MM-DD)"))),
        }
    }

    pub fn number(&self, name: &str) -> Result<Option<f64>, FieldError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| FieldError::new(name, format!("{name} must be a number"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| FieldError::new(name, format!("{name} must be a number"))),
            Some(_) => Err(FieldError::new(name, format!("{name} must be a number"))),
        }
    }

    /// Sub-object field (e.g. `social_links`), also accepted as a JSON-encoded string.
    pub fn object<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<Result<T, FieldError>> {
        let value = self.0.get(name)?;
        let parsed = match value {
            Value::Null => return None,
            Value::String(raw) if raw.trim().is_empty() || raw.trim() == "null" => return None,
            Value::String(raw) => serde_json::from_str::<T>(raw),
            other => serde_json::from_value::<T>(other.clone()),
        };
        Some(parsed.map_err(|_| FieldError::new(name, format!("{name} is malformed"))))
    }
}

/// Violations
///
/// Collects every problem in a submission so the response can enumerate them
/// all instead of stopping at the first.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn add(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Unwraps a fallible field read, recording the error.
    pub fn check<T>(&mut self, result: Result<Option<T>, FieldError>) -> Option<T> {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.add(e);
                None
            }
        }
    }

    /// Create-time read of a required text field: absent or blank is a violation.
    pub fn required(&mut self, fields: &FormFields, name: &str) -> String {
        match fields.text(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                self.push(name, format!("{name} is required"));
                String::new()
            }
        }
    }

    /// Update-time read of a required text field: absent means unchanged, blank
    /// is a violation.
    pub fn non_blank(&mut self, fields: &FormFields, name: &str) -> Option<String> {
        if !fields.contains(name) {
            return None;
        }
        match fields.text(name) {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                self.push(name, format!("{name} cannot be empty"));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The collected violations as an error, for callers that already know
    /// at least one was recorded.
    pub fn into_error(self) -> AppError {
        AppError::Validation(self.0)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

/// JsonBody
///
/// `Json` with rejections rendered through `AppError`, so malformed or oversized
/// bodies get the standard error envelope.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}
