//! API Error Handling
//!
//! Problem responses for failed requests, and the single place where
//! service failures translate into HTTP statuses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::stack::StackError;

/// Problem response body: `{ title, detail, status }`
#[derive(Debug)]
pub struct Problem {
    pub status: StatusCode,
    pub title: &'static str,
    pub detail: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            title,
            detail: detail.into(),
        }
    }

    /// 401 with no body detail.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", "")
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "title": self.title,
                "detail": self.detail,
                "status": self.status.as_u16(),
            })),
        )
            .into_response()
    }
}

impl From<StackError> for Problem {
    fn from(err: StackError) -> Self {
        let detail = err.to_string();
        match err {
            StackError::InvalidTemplate(_)
            | StackError::MissingComponent(_)
            | StackError::MalformedTemplate(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid deployment template", detail)
            }
            StackError::DeploymentFailed => {
                Self::new(StatusCode::BAD_REQUEST, "Deployment failed", detail)
            }
            StackError::ImageUpdateFailed(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Image update failed", detail)
            }
            StackError::TrafficNotUpdated => {
                Self::new(StatusCode::BAD_REQUEST, "Traffic not updated", detail)
            }
            StackError::TrafficUpdateFailed(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Traffic update failed", detail)
            }
            // The caller gets the tool's full raw output, not a summary.
            StackError::DeletionFailed { output } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Stack deletion failed", output)
            }
            StackError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Not Found", detail),
            StackError::QueryFailed(message) => {
                tracing::error!("Platform query failed: {}", message);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Stack lookup failed",
                    "Could not query current stacks from the platform.",
                )
            }
        }
    }
}

pub type ApiResult<T> = Result<T, Problem>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_failures_map_to_400() {
        for err in [
            StackError::InvalidTemplate("bad".to_string()),
            StackError::MissingComponent("Missing component".to_string()),
            StackError::MalformedTemplate("Missing property".to_string()),
            StackError::DeploymentFailed,
        ] {
            let problem = Problem::from(err);
            assert_eq!(problem.status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_deletion_failure_maps_to_500_with_raw_output() {
        let problem = Problem::from(StackError::DeletionFailed {
            output: "line one\nline two".to_string(),
        });
        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem.detail, "line one\nline two");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let problem = Problem::from(StackError::NotFound("lizard-42".to_string()));
        assert_eq!(problem.status, StatusCode::NOT_FOUND);
        assert!(problem.detail.contains("lizard-42"));
    }

    #[test]
    fn test_unauthorized_has_empty_detail() {
        let problem = Problem::unauthorized();
        assert_eq!(problem.status, StatusCode::UNAUTHORIZED);
        assert!(problem.detail.is_empty());
    }
}
