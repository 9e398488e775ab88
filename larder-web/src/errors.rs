use axum::{
    http,
    response::{IntoResponse, Response},
};
pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("Templating error: {0:#}")]
    Template(#[from] minijinja::Error),
    #[error("Bad form submission: {0}")]
    Form(#[from] axum::extract::multipart::MultipartError),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::warn!("{}", message);
        match self {
            WebError::Internal(_) | WebError::Template(_) => {
                (http::StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
            WebError::Form(_) => (http::StatusCode::BAD_REQUEST, message).into_response(),
            WebError::NotFound => (http::StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}
