//! Serializable envelope for handing a render outcome back to a client
//!
//! The transport layer is not part of this crate; this is the JSON shape it
//! emits, built from a [`RenderOutcome`].

use crate::{png_data_uri, QualityTier, RenderOutcome, RenderRequest};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderResponse {
    Success(SuccessBody),
    Failure(FailureBody),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub success: bool,
    /// `data:image/png;base64,...`
    pub image: String,
    pub url: String,
    pub quality: QualityTier,
    pub width: u32,
    pub height: u32,
    pub file_size: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureBody {
    pub success: bool,
    pub error: String,
    #[serde(skip)]
    pub status: u16,
    pub processing_time_ms: u64,
}

impl RenderResponse {
    pub fn from_outcome(request: &RenderRequest, outcome: &RenderOutcome) -> Self {
        let processing_time_ms = outcome.elapsed.as_millis() as u64;

        match &outcome.result {
            Ok(capture) => RenderResponse::Success(SuccessBody {
                success: true,
                image: png_data_uri(&capture.image_bytes),
                url: request.destination_url.clone().unwrap_or_default(),
                quality: request.quality_tier,
                width: capture.width_px,
                height: capture.height_px,
                file_size: capture.byte_len(),
                processing_time_ms,
            }),
            Err(error) => RenderResponse::Failure(FailureBody {
                success: false,
                error: error.message.clone(),
                status: error.status_code(),
                processing_time_ms,
            }),
        }
    }

    /// HTTP status to send with this body
    pub fn status_code(&self) -> u16 {
        match self {
            RenderResponse::Success(_) => 200,
            RenderResponse::Failure(body) => body.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaptureResult, ClassifiedError, ErrorKind};
    use std::time::Duration;

    #[test]
    fn test_success_body() {
        let request = RenderRequest {
            quality_tier: QualityTier::Mobile,
            ..RenderRequest::new("https://example.com")
        };
        let outcome = RenderOutcome {
            result: Ok(CaptureResult {
                image_bytes: vec![1, 2, 3],
                width_px: 750,
                height_px: 1334,
            }),
            elapsed: Duration::from_millis(1234),
        };

        let response = RenderResponse::from_outcome(&request, &outcome);
        assert_eq!(response.status_code(), 200);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["image"], "data:image/png;base64,AQID");
        assert_eq!(json["url"], "https://example.com");
        assert_eq!(json["quality"], "mobile");
        assert_eq!(json["width"], 750);
        assert_eq!(json["height"], 1334);
        assert_eq!(json["fileSize"], 3);
        assert_eq!(json["processingTimeMs"], 1234);
    }

    #[test]
    fn test_failure_body() {
        let outcome = RenderOutcome {
            result: Err(ClassifiedError {
                kind: ErrorKind::NavigationTimeout,
                message: "Navigation timeout - site took too long to load".to_string(),
            }),
            elapsed: Duration::from_millis(20_010),
        };

        let response = RenderResponse::from_outcome(&RenderRequest::new("https://slow.test"), &outcome);
        assert_eq!(response.status_code(), 408);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Navigation timeout - site took too long to load");
        assert_eq!(json["processingTimeMs"], 20_010);
        assert!(json.get("status").is_none());
    }
}
