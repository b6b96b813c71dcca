// Success envelope shared by every 2xx response

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Uniform success body: `{"status": "success", "data": ...}`
///
/// The counterpart failure body lives in [`crate::error::ErrorBody`].
#[derive(Serialize)]
pub struct ApiSuccess<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Wrap a payload in the success envelope (200 unless paired with a status)
pub fn success<T: Serialize>(data: T) -> ApiSuccess<T> {
    ApiSuccess {
        status: "success",
        data,
    }
}

/// Wrap a payload in the success envelope with 201 Created
pub fn created<T: Serialize>(data: T) -> (StatusCode, ApiSuccess<T>) {
    (StatusCode::CREATED, success(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_the_status_marker() {
        let body = success(serde_json::json!({"id": 7}));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["id"], 7);
    }

    #[test]
    fn created_pairs_the_201_code() {
        let (code, body) = created(42);
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body.data, 42);
    }
}
