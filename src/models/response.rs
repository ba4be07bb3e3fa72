use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Status and body of a completed API call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, data: Option<Value>) -> Self {
        Self { status, data }
    }
}

/// Terminal state of a logical request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// An attempt got a response, passed through unaltered
    Success(ApiResponse),
    /// The retry cap was reached without a response
    Exhausted { attempts: u32 },
}

impl FetchOutcome {
    /// Status seen by callers; exhaustion is reported as 429
    pub fn status(&self) -> StatusCode {
        match self {
            FetchOutcome::Success(response) => response.status,
            FetchOutcome::Exhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            FetchOutcome::Success(response) => response.data.as_ref(),
            FetchOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchOutcome::Exhausted { .. })
    }

    /// Flatten into the `{status, data}` shape
    pub fn into_response(self) -> ApiResponse {
        match self {
            FetchOutcome::Success(response) => response,
            FetchOutcome::Exhausted { .. } => {
                ApiResponse::new(StatusCode::TOO_MANY_REQUESTS, None)
            }
        }
    }
}

fn serialize_status<S>(status: &StatusCode, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u16(status.as_u16())
}
