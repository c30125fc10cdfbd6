//! Gateway protocol messages.
//!
//! This module defines the JSON protocol spoken between the `jobscope` CLI and
//! the tracking gateway. Requests and responses are tagged by a `type` field.
//!
//! # Message Flow
//!
//! ```text
//! ┌──────────┐     ApiRequest      ┌─────────────┐
//! │ jobscope │────────────────────►│   Gateway   │
//! │          │◄────────────────────│             │
//! └──────────┘     ApiResponse     └─────────────┘
//! ```
//!
//! One-shot requests (`get_entity`, `list_statuses`) are answered by a single
//! response. Subscriptions (`subscribe_logs`, `subscribe_resources`) are
//! acknowledged with `subscribed`, followed by any number of `message` frames
//! and a final `stream_end`.
//!
//! # Example
//!
//! ```rust
//! use jobscope_proto::api::{ApiRequest, ApiResponse};
//!
//! let request = ApiRequest::hello("0.1.0");
//! let json = request.to_json().unwrap();
//! assert!(json.contains("hello"));
//!
//! let response = ApiResponse::from_json(r#"
//!     {"type": "stream_end", "delivered": 12}
//! "#).unwrap();
//! assert!(matches!(response, ApiResponse::StreamEnd { delivered: 12 }));
//! ```

use serde::{Deserialize, Serialize};

use crate::ProtoError;
use crate::types::{Address, Cursor, Entity, JobAddress, ResponsePage, StreamKind, StreamMessage};

/// Protocol version for gateway communication.
pub const API_PROTOCOL_VERSION: u32 = 1;

/// Messages sent from the CLI to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiRequest {
    /// Handshake to identify the client.
    Hello {
        /// Client version.
        version: String,
        /// Protocol version.
        protocol_version: u32,
    },

    /// Fetch a single project, experiment or job.
    GetEntity {
        /// Target entity.
        address: Address,
    },

    /// Fetch one page of status records.
    ListStatuses {
        /// Entity whose statuses are listed.
        address: Address,
        /// Cursor from the previous page (None for the first page).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<Cursor>,
    },

    /// Subscribe to a job's log lines.
    SubscribeLogs {
        /// Target job.
        job: JobAddress,
    },

    /// Subscribe to a job's resource samples.
    SubscribeResources {
        /// Target job.
        job: JobAddress,
    },
}

/// Messages sent from the gateway to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiResponse {
    /// Handshake accepted.
    Welcome {
        /// Server version.
        server_version: String,
        /// Protocol version.
        protocol_version: u32,
    },

    /// A single entity.
    Entity {
        /// The entity.
        entity: Entity,
    },

    /// A page of status records.
    Statuses {
        /// The page.
        page: ResponsePage,
    },

    /// Subscription accepted; messages follow.
    Subscribed {
        /// Which feed was opened.
        stream: StreamKind,
    },

    /// One streamed message.
    Message {
        /// Payload.
        message: StreamMessage,
    },

    /// The gateway finished the stream.
    StreamEnd {
        /// Number of messages the gateway sent.
        delivered: u64,
    },

    /// Request failed.
    Error {
        /// Error code (see [`error_codes`]).
        code: u32,
        /// Human-readable message.
        message: String,
        /// Request that caused the error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_type: Option<String>,
    },
}

/// Error codes carried by [`ApiResponse::Error`].
pub mod error_codes {
    /// Entity not found.
    pub const NOT_FOUND: u32 = 1001;
    /// Invalid request.
    pub const INVALID_REQUEST: u32 = 1003;
    /// Authenticated but not allowed to see the entity.
    pub const PERMISSION_DENIED: u32 = 1005;
    /// Internal error.
    pub const INTERNAL_ERROR: u32 = 1006;
    /// Protocol version mismatch.
    pub const PROTOCOL_MISMATCH: u32 = 1008;
    /// Gateway is overloaded or shutting down.
    pub const UNAVAILABLE: u32 = 1009;
    /// Missing or invalid credentials.
    pub const UNAUTHENTICATED: u32 = 1010;
}

impl ApiRequest {
    /// Create a hello message.
    #[must_use]
    pub fn hello(version: impl Into<String>) -> Self {
        Self::Hello {
            version: version.into(),
            protocol_version: API_PROTOCOL_VERSION,
        }
    }

    /// Create the subscription request for a feed.
    #[must_use]
    pub fn subscribe(stream: StreamKind, job: JobAddress) -> Self {
        match stream {
            StreamKind::Logs => Self::SubscribeLogs { job },
            StreamKind::Resources => Self::SubscribeResources { job },
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Get the request type name for error reporting.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::GetEntity { .. } => "get_entity",
            Self::ListStatuses { .. } => "list_statuses",
            Self::SubscribeLogs { .. } => "subscribe_logs",
            Self::SubscribeResources { .. } => "subscribe_resources",
        }
    }
}

impl ApiResponse {
    /// Create a welcome response.
    #[must_use]
    pub fn welcome(server_version: impl Into<String>) -> Self {
        Self::Welcome {
            server_version: server_version.into(),
            protocol_version: API_PROTOCOL_VERSION,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
            request_type: None,
        }
    }

    /// Create an error response with request type.
    #[must_use]
    pub fn error_for_request(
        code: u32,
        message: impl Into<String>,
        request_type: impl Into<String>,
    ) -> Self {
        Self::Error {
            code,
            message: message.into(),
            request_type: Some(request_type.into()),
        }
    }

    /// Wrap a streamed message.
    #[must_use]
    pub const fn message(message: StreamMessage) -> Self {
        Self::Message { message }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityStatus, JobRef, PageMeta, ProjectRef};

    fn job() -> JobAddress {
        let project = ProjectRef::new("adam", "mnist").expect("valid project");
        JobAddress::within(project, 1, JobRef::Sequence(2))
    }

    #[test]
    fn test_hello_message() {
        let msg = ApiRequest::hello("1.0.0");
        let json = msg.to_json().expect("encode");
        assert!(json.contains("hello"));
        assert!(json.contains("1.0.0"));

        let parsed = ApiRequest::from_json(&json).expect("decode");
        assert_eq!(msg, parsed);
    }

    #[test]
    fn test_list_statuses_omits_missing_cursor() {
        let msg = ApiRequest::ListStatuses {
            address: job().into(),
            cursor: None,
        };
        let json = msg.to_json().expect("encode");
        assert!(json.contains("list_statuses"));
        assert!(!json.contains("cursor"));

        let with_cursor = ApiRequest::ListStatuses {
            address: job().into(),
            cursor: Some(Cursor::new("offset=20")),
        };
        let json = with_cursor.to_json().expect("encode");
        assert!(json.contains("\"cursor\":\"offset=20\""));
        assert_eq!(ApiRequest::from_json(&json).expect("decode"), with_cursor);
    }

    #[test]
    fn test_subscribe_picks_request() {
        assert_eq!(
            ApiRequest::subscribe(StreamKind::Logs, job()).request_type(),
            "subscribe_logs"
        );
        assert_eq!(
            ApiRequest::subscribe(StreamKind::Resources, job()).request_type(),
            "subscribe_resources"
        );
    }

    #[test]
    fn test_statuses_response() {
        let resp = ApiResponse::Statuses {
            page: ResponsePage {
                items: vec![Entity::new("s1", Some(EntityStatus::Running))],
                meta: Some(PageMeta {
                    count: 3,
                    has_next: true,
                    has_previous: false,
                }),
                next: Some(Cursor::new("2")),
            },
        };
        let json = resp.to_json().expect("encode");
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"has_next\":true"));

        let parsed = ApiResponse::from_json(&json).expect("decode");
        assert_eq!(resp, parsed);
    }

    #[test]
    fn test_message_frame() {
        let json = r#"{"type":"message","message":{"type":"log_line","log_line":"hello"}}"#;
        let resp = ApiResponse::from_json(json).expect("decode");
        assert_eq!(resp, ApiResponse::message(StreamMessage::log_line("hello")));
    }

    #[test]
    fn test_error_response() {
        let resp = ApiResponse::error(error_codes::NOT_FOUND, "Job not found");
        assert!(matches!(resp, ApiResponse::Error { code: error_codes::NOT_FOUND, .. }));

        let json = resp.to_json().expect("encode");
        assert!(json.contains("error"));
        assert!(json.contains("1001"));
        assert!(!json.contains("request_type"));
    }

    #[test]
    fn test_error_response_with_request_type() {
        let resp = ApiResponse::error_for_request(
            error_codes::PERMISSION_DENIED,
            "no access",
            "get_entity",
        );
        match ApiResponse::from_json(&resp.to_json().expect("encode")).expect("decode") {
            ApiResponse::Error { request_type, .. } => {
                assert_eq!(request_type.as_deref(), Some("get_entity"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_decoding_error() {
        let err = ApiResponse::from_json("{not json").expect_err("invalid");
        assert!(matches!(err, ProtoError::Decoding(_)));
    }
}
