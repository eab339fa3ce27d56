use serde::Deserialize;

/// A `postMessage` delivered to the hosting page.
#[derive(Debug, Clone)]
pub struct WindowMessage {
    pub origin: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizationPayload {
    code: Option<String>,
}

/// Accepts authorization codes posted back by the OAuth popup.
pub struct MessageGateway {
    host_origin: String,
}

impl MessageGateway {
    pub fn new(host_origin: impl Into<String>) -> Self {
        Self {
            host_origin: host_origin.into(),
        }
    }

    /// Authorization code carried by `message`, if it came from our own
    /// origin and is well formed. Everything else is dropped.
    pub fn accept(&self, message: &WindowMessage) -> Option<String> {
        if message.origin != self.host_origin {
            return None;
        }

        match serde_json::from_str::<AuthorizationPayload>(&message.data) {
            Ok(AuthorizationPayload { code: Some(code) }) if !code.is_empty() => Some(code),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Ignoring malformed window message: {}", e);
                None
            }
        }
    }
}
