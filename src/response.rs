use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Uniform success envelope for every response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "Operation successful".into(),
            data: Some(data),
            meta: None,
        }
    }

    pub fn paginated(data: T, meta: PaginationMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }
}

impl ApiResponse<()> {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            meta: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Metadata for an offset/limit window over `total` rows.
    pub fn from_window(skip: i64, limit: i64, total: i64) -> Self {
        let (page, pages) = if limit > 0 {
            let pages = total / limit + i64::from(total % limit != 0);
            ((skip / limit).saturating_add(1), pages)
        } else {
            (1, 0)
        };
        Self {
            page,
            per_page: limit,
            total,
            pages,
            has_next: skip.saturating_add(limit) < total,
            has_prev: skip > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_twenty_five() {
        let meta = PaginationMeta::from_window(0, 10, 25);
        assert_eq!(
            meta,
            PaginationMeta {
                page: 1,
                per_page: 10,
                total: 25,
                pages: 3,
                has_next: true,
                has_prev: false,
            }
        );
    }

    #[test]
    fn last_partial_page() {
        let meta = PaginationMeta::from_window(20, 10, 25);
        assert_eq!(meta.page, 3);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn empty_table_has_no_pages() {
        let meta = PaginationMeta::from_window(0, 10, 0);
        assert_eq!(meta.pages, 0);
        assert_eq!(meta.page, 1);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn extreme_window_saturates() {
        let meta = PaginationMeta::from_window(i64::MAX, 1, 0);
        assert_eq!(meta.page, i64::MAX);
        assert!(!meta.has_next);
        assert!(meta.has_prev);

        let meta = PaginationMeta::from_window(0, 100, i64::MAX);
        assert_eq!(meta.pages, i64::MAX / 100 + 1);
        assert!(meta.has_next);
    }

    #[test]
    fn envelope_serializes_data_and_meta() {
        let body = ApiResponse::paginated(vec![1, 2], PaginationMeta::from_window(0, 2, 4));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["pages"], 2);
    }

    #[test]
    fn empty_envelope_has_null_data_and_no_meta() {
        let json = serde_json::to_value(ApiResponse::empty("User deleted")).unwrap();
        assert_eq!(json["message"], "User deleted");
        assert!(json["data"].is_null());
        assert!(json.get("meta").is_none());
    }
}
