//! Credential encoding for outbound Confluence requests.
//!
//! Both backend clients call [`auth_headers`] so the choice between bearer
//! and basic authentication never leaks into request-building code.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

/// The credential used to authenticate against Confluence.
///
/// Which variant is active is decided once at config time
/// (see [`Config::credential`](crate::config::Config::credential)).
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Personal access token, sent as `Authorization: Bearer <token>`.
    Bearer { token: String },
    /// Account email plus API token, sent as HTTP basic auth.
    Basic { email: String, api_token: String },
    /// No credential. Used behind an auth-injecting proxy.
    Anonymous,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::Bearer {
            token: token.into(),
        }
    }

    pub fn basic(email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Credential::Basic {
            email: email.into(),
            api_token: api_token.into(),
        }
    }

    /// Short label for logs. Never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Bearer { .. } => "bearer",
            Credential::Basic { .. } => "basic",
            Credential::Anonymous => "none",
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer { .. } => f.write_str("Credential::Bearer(***)"),
            Credential::Basic { email, .. } => write!(f, "Credential::Basic({}, ***)", email),
            Credential::Anonymous => f.write_str("Credential::Anonymous"),
        }
    }
}

/// Builds the `Authorization` header for a credential.
///
/// Returns an empty map for [`Credential::Anonymous`], and also when the
/// encoded value is not a valid header value (e.g. it contains a newline),
/// in which case the request goes out unauthenticated and the backend
/// answers 401.
pub fn auth_headers(credential: &Credential) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let value = match credential {
        Credential::Bearer { token } => format!("Bearer {}", token),
        Credential::Basic { email, api_token } => {
            let encoded = STANDARD.encode(format!("{}:{}", email, api_token));
            format!("Basic {}", encoded)
        }
        Credential::Anonymous => return headers,
    };

    if let Ok(mut header) = HeaderValue::from_str(&value) {
        header.set_sensitive(true);
        headers.insert(AUTHORIZATION, header);
    }

    headers
}
