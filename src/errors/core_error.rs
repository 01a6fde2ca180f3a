use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Unauthorized,
    Unavailable,
    Internal,
}

impl CoreErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            CoreErrorKind::NotFound => "NOT_FOUND",
            CoreErrorKind::Validation => "VALIDATION_FAILED",
            CoreErrorKind::Conflict => "CONFLICT",
            CoreErrorKind::Forbidden => "FORBIDDEN",
            CoreErrorKind::Unauthorized => "UNAUTHORIZED",
            CoreErrorKind::Unavailable => "UPSTREAM_UNAVAILABLE",
            CoreErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether the message may be shown to the caller as-is.
    pub fn is_client_facing(&self) -> bool {
        !matches!(self, CoreErrorKind::Unavailable | CoreErrorKind::Internal)
    }
}

#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<BTreeMap<String, String>>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("entity".to_string(), entity.into());
        fields.insert("id".to_string(), id.into());

        Self {
            kind: CoreErrorKind::NotFound,
            message: "Resource not found".to_string(),
            fields: Some(fields),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unauthorized, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        let err: Box<dyn StdError + Send + Sync> = err.into();
        Self {
            kind: CoreErrorKind::Internal,
            message: "Unhandled error".to_string(),
            fields: None,
            source: Some(err),
        }
    }
}

impl From<sea_orm::DbErr> for CoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(message) => {
                CoreError::new(CoreErrorKind::NotFound, message.clone())
            }
            _ => CoreError::internal("Database operation failed").with_source(err),
        }
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self.kind {
            CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
            CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
            CoreErrorKind::Conflict => StatusCode::CONFLICT,
            CoreErrorKind::Forbidden => StatusCode::FORBIDDEN,
            CoreErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreErrorKind::Unavailable => StatusCode::BAD_GATEWAY,
            CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(kind = ?self.kind, error = %self, source = ?self.source, "Request failed");
        }

        let message = if self.kind.is_client_facing() {
            self.message
        } else {
            "The request could not be completed, please try again".to_string()
        };

        let body = serde_json::json!({
            "error": self.kind.code(),
            "message": message,
            "fields": self.fields,
        });

        (status, axum::Json(body)).into_response()
    }
}
