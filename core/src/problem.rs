use std::borrow::Cow;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use http_api_problem::{HttpApiProblem, PROBLEM_JSON_MEDIA_TYPE};
use log::error;
use sqlx::postgres::PgDatabaseError;

/// How to add a new error case: add a variant here, then a matching arm in
/// `From<WebhookProblem> for Problem` below.
#[derive(Debug, Clone, strum::Display)]
pub enum WebhookProblem {
    SubscriptionNotFound,
    SubscriptionDisabled,
    PayloadNotFound,

    MissingSignatureHeader,
    InvalidSignature,
    InvalidJsonPayload(String),

    Validation(String),
    NotFound,
    InternalServerError,
}

impl From<sqlx::Error> for WebhookProblem {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => WebhookProblem::NotFound,
            sqlx::Error::Database(ex) => match ex.try_downcast_ref::<PgDatabaseError>() {
                Some(pg_error) => {
                    error!("Database error: {pg_error}");
                    WebhookProblem::InternalServerError
                }
                None => {
                    error!("Database error: {ex}");
                    WebhookProblem::InternalServerError
                }
            },
            err => {
                error!("{err}");
                WebhookProblem::InternalServerError
            }
        }
    }
}

impl From<redis::RedisError> for WebhookProblem {
    fn from(e: redis::RedisError) -> Self {
        // Cache failures are never fatal (see core::cache); this conversion
        // exists only for call sites that choose to surface one directly.
        error!("Redis error: {e}");
        WebhookProblem::InternalServerError
    }
}

struct Problem {
    title: &'static str,
    detail: Cow<'static, str>,
    status: StatusCode,
}

impl From<&WebhookProblem> for Problem {
    fn from(problem: &WebhookProblem) -> Self {
        match problem {
            WebhookProblem::SubscriptionNotFound => Problem {
                title: "Subscription not found",
                detail: "No subscription exists with this id.".into(),
                status: StatusCode::NOT_FOUND,
            },
            WebhookProblem::SubscriptionDisabled => Problem {
                title: "Subscription is disabled",
                detail: "This subscription is not currently accepting webhooks.".into(),
                status: StatusCode::GONE,
            },
            WebhookProblem::PayloadNotFound => Problem {
                title: "Payload not found",
                detail: "No ingested payload exists with this id.".into(),
                status: StatusCode::NOT_FOUND,
            },
            WebhookProblem::MissingSignatureHeader => Problem {
                title: "Missing signature header",
                detail: "This subscription requires a X-Hub-Signature-256 header.".into(),
                status: StatusCode::UNAUTHORIZED,
            },
            WebhookProblem::InvalidSignature => Problem {
                title: "Invalid signature",
                detail: "The provided signature does not match the request body.".into(),
                status: StatusCode::UNAUTHORIZED,
            },
            WebhookProblem::InvalidJsonPayload(detail) => Problem {
                title: "Invalid JSON payload",
                detail: detail.to_owned().into(),
                status: StatusCode::BAD_REQUEST,
            },
            WebhookProblem::Validation(detail) => Problem {
                title: "Validation failed",
                detail: detail.to_owned().into(),
                status: StatusCode::BAD_REQUEST,
            },
            WebhookProblem::NotFound => Problem {
                title: "Not found",
                detail: "The requested resource does not exist.".into(),
                status: StatusCode::NOT_FOUND,
            },
            WebhookProblem::InternalServerError => Problem {
                title: "Internal server error",
                detail: "Something went wrong on our end.".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<&WebhookProblem> for HttpApiProblem {
    fn from(webhook_problem: &WebhookProblem) -> Self {
        let problem: Problem = webhook_problem.into();
        HttpApiProblem::new(problem.status)
            .value("id".to_owned(), &webhook_problem.to_string())
            .title(problem.title)
            .detail(problem.detail)
    }
}

impl ResponseError for WebhookProblem {
    fn status_code(&self) -> StatusCode {
        let problem: Problem = self.into();
        problem.status
    }

    fn error_response(&self) -> HttpResponse {
        let problem: HttpApiProblem = self.into();
        let status = problem
            .status
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        HttpResponse::build(status)
            .append_header((
                actix_web::http::header::CONTENT_TYPE,
                PROBLEM_JSON_MEDIA_TYPE,
            ))
            .body(problem.json_bytes())
    }
}

impl std::error::Error for WebhookProblem {}
