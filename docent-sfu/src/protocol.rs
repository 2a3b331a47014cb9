//! JSON-RPC-like wire protocol spoken with the SFU
//!
//! Outbound requests carry `{id, method, params}`. Inbound documents are
//! either notifications (`{method, params}`), results (`{result}`) or errors
//! (`{id, error}`), and are decoded into [`UpstreamMessage`] at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    types::{RequestId, TrickleTarget},
};

/// Kind of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// `RTCSessionDescriptionInit` as browsers serialize it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    /// Parse a client-supplied description
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("invalid session description: {e}")))
    }
}

/// `RTCIceCandidateInit` as browsers serialize it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidateInit {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("invalid ICE candidate: {e}")))
    }
}

/// Outbound request envelope
#[derive(Debug, Serialize)]
pub struct Request<P> {
    pub id: RequestId,
    pub method: &'static str,
    pub params: P,
}

#[derive(Debug, Serialize)]
pub struct JoinParams<'a> {
    pub sid: &'a str,
    pub uid: &'a str,
    pub offer: SessionDescription,
}

/// Params of `offer` and `answer`
#[derive(Debug, Serialize)]
pub struct NegotiateParams {
    pub desc: SessionDescription,
}

#[derive(Debug, Serialize)]
pub struct TrickleParams {
    pub candidate: IceCandidateInit,
    pub target: TrickleTarget,
}

/// Inbound document that matched a known envelope but no handled variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unhandled {
    Method(String),
    Result,
}

/// Decoded inbound document
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamMessage {
    /// `trickle` notification; params relayed untouched
    Trickle(Value),
    /// `offer` notification; params relayed untouched
    Offer(Value),
    /// Result shaped as an answer description
    AnswerResult(SessionDescription),
    /// JSON-RPC error response to one of our requests
    RpcError {
        id: Option<RequestId>,
        code: i64,
        message: String,
    },
    Unknown(Unhandled),
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl UpstreamMessage {
    /// Classify one complete JSON document
    pub fn decode(document: Value) -> Result<Self> {
        let Value::Object(mut object) = document else {
            return Err(Error::Protocol("upstream document is not an object".to_string()));
        };

        if let Some(method) = object.remove("method") {
            let Value::String(method) = method else {
                return Err(Error::Protocol("method is not a string".to_string()));
            };
            let params = object.remove("params").unwrap_or(Value::Null);
            return Ok(match method.as_str() {
                "trickle" => Self::Trickle(params),
                "offer" => Self::Offer(params),
                _ => Self::Unknown(Unhandled::Method(method)),
            });
        }

        if let Some(result) = object.remove("result") {
            return Ok(match serde_json::from_value::<SessionDescription>(result) {
                Ok(desc) if desc.sdp_type == SdpType::Answer => Self::AnswerResult(desc),
                _ => Self::Unknown(Unhandled::Result),
            });
        }

        if let Some(error) = object.remove("error") {
            let body: RpcErrorBody = serde_json::from_value(error)
                .map_err(|e| Error::Protocol(format!("malformed error response: {e}")))?;
            let id = object
                .get("id")
                .and_then(Value::as_u64)
                .map(RequestId::new);
            return Ok(Self::RpcError {
                id,
                code: body.code,
                message: body.message,
            });
        }

        Err(Error::Protocol(
            "document has neither method, result nor error".to_string(),
        ))
    }

    /// Label used for logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trickle(_) => "trickle",
            Self::Offer(_) => "offer",
            Self::AnswerResult(_) => "answer",
            Self::RpcError { .. } => "error",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_shape() {
        let request = Request {
            id: RequestId::new(1),
            method: "join",
            params: JoinParams {
                sid: "room-1",
                uid: "alice",
                offer: SessionDescription::parse(r#"{"type":"offer","sdp":"v=0"}"#).unwrap(),
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "id": 1,
                "method": "join",
                "params": {"sid": "room-1", "uid": "alice", "offer": {"type": "offer", "sdp": "v=0"}}
            })
        );
    }

    #[test]
    fn test_trickle_params_shape() {
        let candidate = IceCandidateInit::parse(
            r#"{"candidate":"candidate:1 1 udp 1 10.0.0.1 5000 typ host","sdpMid":"0","sdpMLineIndex":0}"#,
        )
        .unwrap();
        let params = TrickleParams {
            candidate,
            target: TrickleTarget::Publisher,
        };

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "candidate": {
                    "candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host",
                    "sdpMid": "0",
                    "sdpMLineIndex": 0
                },
                "target": 0
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            SessionDescription::parse("not json"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            SessionDescription::parse(r#"{"type":"bogus","sdp":""}"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            IceCandidateInit::parse(r#"{"sdpMid":"0"}"#),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_decode_notifications() {
        let params = json!({"candidate": {"candidate": "c"}, "target": 1});
        assert_eq!(
            UpstreamMessage::decode(json!({"method": "trickle", "params": params})).unwrap(),
            UpstreamMessage::Trickle(params)
        );

        let offer = json!({"type": "offer", "sdp": "v=0..."});
        assert_eq!(
            UpstreamMessage::decode(json!({"jsonrpc": "2.0", "method": "offer", "params": offer})).unwrap(),
            UpstreamMessage::Offer(offer)
        );

        assert_eq!(
            UpstreamMessage::decode(json!({"method": "ping"})).unwrap(),
            UpstreamMessage::Unknown(Unhandled::Method("ping".to_string()))
        );
    }

    #[test]
    fn test_decode_results() {
        let decoded =
            UpstreamMessage::decode(json!({"id": 1, "result": {"type": "answer", "sdp": "v=0"}}))
                .unwrap();
        assert!(matches!(
            decoded,
            UpstreamMessage::AnswerResult(SessionDescription { sdp_type: SdpType::Answer, .. })
        ));

        assert_eq!(
            UpstreamMessage::decode(json!({"result": {"type": "offer", "sdp": "v=0"}})).unwrap(),
            UpstreamMessage::Unknown(Unhandled::Result)
        );
        assert_eq!(
            UpstreamMessage::decode(json!({"result": true})).unwrap(),
            UpstreamMessage::Unknown(Unhandled::Result)
        );
    }

    #[test]
    fn test_decode_error_response() {
        let decoded = UpstreamMessage::decode(
            json!({"id": 3, "error": {"code": -32000, "message": "session not found"}}),
        )
        .unwrap();
        assert_eq!(
            decoded,
            UpstreamMessage::RpcError {
                id: Some(RequestId::new(3)),
                code: -32000,
                message: "session not found".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_shapes() {
        assert!(matches!(
            UpstreamMessage::decode(json!({"id": 1})),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            UpstreamMessage::decode(json!([1, 2])),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            UpstreamMessage::decode(json!({"method": 5})),
            Err(Error::Protocol(_))
        ));
    }
}
