//! Wire protocol for the charging network.
//!
//! Requests are `{ "type": <operation>, "data": <payload> }` envelopes; every
//! reply is `{ message, success, data }` on success or
//! `{ message, success: false, error: { code, message } }` on failure. The
//! router binds each operation tag to a handler before serving and dispatches
//! with a constant-time lookup; payloads that fail schema validation never
//! reach a handler.

mod charge;
mod station;
mod vehicle;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use volt_core::{NetworkError, NetworkState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    InvalidRequest,
    PreconditionFailed,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    pub code: ErrorCode,
    pub message: String,
}

/// Reply envelope written back to the client, one per request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub message: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Reply {
    pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Reply {
        Reply {
            message: message.into(),
            success: true,
            data: Some(serde_json::to_value(data).expect("reply payloads serialize to JSON")),
            error: None,
        }
    }

    /// Success without a data payload.
    pub fn ack(message: impl Into<String>) -> Reply {
        Reply {
            message: message.into(),
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn fail(err: NetworkError) -> Reply {
        let message = err.to_string();
        Reply {
            message: message.clone(),
            success: false,
            data: None,
            error: Some(WireError {
                code: error_code(&err),
                message,
            }),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Reply {
        let message = message.into();
        Reply {
            message: message.clone(),
            success: false,
            data: None,
            error: Some(WireError {
                code: ErrorCode::InvalidRequest,
                message,
            }),
        }
    }
}

fn error_code(err: &NetworkError) -> ErrorCode {
    match err {
        NetworkError::VehicleNotFound { .. }
        | NetworkError::StationNotFound { .. }
        | NetworkError::ChargeNotFound { .. } => ErrorCode::NotFound,
        NetworkError::DuplicateStation { .. }
        | NetworkError::AlreadyReserved { .. }
        | NetworkError::StationBusy { .. }
        | NetworkError::AlreadyCharging { .. }
        | NetworkError::NotCharging { .. }
        | NetworkError::AlreadyPaid { .. } => ErrorCode::Conflict,
        NetworkError::NotHeadOfQueue { .. } | NetworkError::ChargeOwnership { .. } => {
            ErrorCode::PreconditionFailed
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    op: String,
    #[serde(default)]
    data: Value,
}

pub type Handler = Box<dyn Fn(&mut NetworkState, Value) -> Reply + Send + Sync>;

/// Binds operation tags to handlers. Every binding happens before the router
/// starts serving; binding a tag twice is a programming error.
#[derive(Default)]
pub struct RouterBuilder {
    routes: HashMap<&'static str, Handler>,
}

impl RouterBuilder {
    pub fn route(mut self, op: &'static str, handler: Handler) -> Self {
        let previous = self.routes.insert(op, handler);
        assert!(previous.is_none(), "operation `{op}` bound twice");
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
        }
    }
}

pub struct Router {
    routes: HashMap<&'static str, Handler>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Parse one raw request, validate it, and run the matching handler.
    /// Malformed envelopes and unknown tags come back as `INVALID_REQUEST`
    /// without touching the domain state.
    pub fn dispatch(&self, state: &mut NetworkState, raw: &str) -> Reply {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!("rejecting malformed request: {err}");
                return Reply::invalid(format!("malformed request: {err}"));
            }
        };
        match self.routes.get(envelope.op.as_str()) {
            Some(handler) => handler(state, envelope.data),
            None => Reply::invalid(format!("unknown operation `{}`", envelope.op)),
        }
    }
}

/// Adapt a typed route function into a boxed handler. Payloads that do not
/// match the operation's schema are rejected here, so route functions always
/// see well-formed input.
fn handler<P, F>(route: F) -> Handler
where
    P: DeserializeOwned,
    F: Fn(&mut NetworkState, P) -> Reply + Send + Sync + 'static,
{
    Box::new(move |state, payload| match serde_json::from_value(payload) {
        Ok(payload) => route(state, payload),
        Err(err) => Reply::invalid(format!("invalid payload: {err}")),
    })
}

/// The full operation table of the charging network.
pub fn default_router() -> Router {
    Router::builder()
        .route("registerUser", handler(vehicle::register_user))
        .route("registerStation", handler(station::register_station))
        .route("getSuggestions", handler(station::get_suggestions))
        .route("getStationInfo", handler(station::get_station_info))
        .route("reserve", handler(station::reserve))
        .route("startCharging", handler(charge::start_charging))
        .route("endCharging", handler(charge::end_charging))
        .route("rechargeList", handler(charge::recharge_list))
        .route("payment", handler(charge::payment))
        .build()
}
