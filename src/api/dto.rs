use serde::{Deserialize, Serialize};

use crate::services::{LinkResult, OrderResult, ServiceError};

// ============================================================================
// Wire types (camelCase JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OrderData>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&OrderResult> for SearchResponse {
    fn from(result: &OrderResult) -> Self {
        let data = match result {
            OrderResult::NotFound => None,
            OrderResult::InProduction { order_number } => Some(OrderData {
                order_number: order_number.to_string(),
                image_url: None,
            }),
            OrderResult::Ready {
                order_number,
                photo_reference,
            } => Some(OrderData {
                order_number: order_number.to_string(),
                image_url: Some(photo_reference.to_string()),
            }),
        };

        Self {
            status: result.status_label().to_string(),
            data,
        }
    }
}

/// Query string of the photo upload; the body is the raw image
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub email: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub replayed: bool,
}

impl From<LinkResult> for UploadResponse {
    fn from(result: LinkResult) -> Self {
        Self {
            success: result.success,
            message: Some(result.message),
            order_number: Some(result.order_number.to_string()),
            image_url: Some(result.photo_reference.to_string()),
            replayed: result.replayed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOrderRequest {
    pub email: String,
    pub order_number: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOrderResponse {
    pub success: bool,
    pub order_number: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self {
            success: false,
            error: err.kind().to_string(),
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub email: Option<String>,
}
