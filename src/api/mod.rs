use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub mod courses;
pub mod exercises;
pub mod health;
pub mod lessons;
pub mod modules;
pub mod options;
pub mod speech;
pub mod users;
pub mod vocabulary;

/// Body of every successful API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message.into()),
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
