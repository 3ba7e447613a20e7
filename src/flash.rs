//! One-shot messages shown on the page that follows a redirect.
//!
//! Messages travel in a cookie holding base64url-encoded JSON and are
//! cleared as soon as a page renders them.

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const COOKIE_NAME: &str = "flash";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }
}

/// 303 redirect to `location` carrying `message` to the next rendered page.
pub fn redirect(location: &str, message: FlashMessage) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(cookie(&[message]))
        .finish()
}

/// Reads the pending messages. The caller is responsible for clearing the
/// cookie with [`removal_cookie`] once they have been shown.
pub fn take(req: &HttpRequest) -> Vec<FlashMessage> {
    req.cookie(COOKIE_NAME)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(COOKIE_NAME, "").path("/").finish();
    cookie.make_removal();
    cookie
}

fn cookie(messages: &[FlashMessage]) -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, encode(messages))
        .path("/")
        .http_only(true)
        .finish()
}

fn encode(messages: &[FlashMessage]) -> String {
    // Serializing plain strings and unit variants cannot fail
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode(value: &str) -> Vec<FlashMessage> {
    let parsed = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| err.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|err| err.to_string()));
    match parsed {
        Ok(messages) => messages,
        Err(err) => {
            tracing::debug!(error = %err, "discarding malformed flash cookie");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn cookie_round_trip() {
        let messages = vec![
            FlashMessage::success("Expense added!"),
            FlashMessage::error("Please enter a valid amount; \"abc\" isn't one"),
        ];
        assert_eq!(decode(&encode(&messages)), messages);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(decode("not base64 !!").is_empty());
        assert!(decode(&URL_SAFE_NO_PAD.encode(b"{\"nope\":1}")).is_empty());
    }

    #[test]
    fn redirect_sets_location_and_cookie() {
        let response = redirect("/groups", FlashMessage::success("Group created successfully"));
        assert_eq!(response.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/groups");
        let cookie = response
            .cookies()
            .find(|c| c.name() == COOKIE_NAME)
            .expect("flash cookie");
        assert_eq!(
            decode(cookie.value()),
            vec![FlashMessage::success("Group created successfully")]
        );
    }

    #[test]
    fn take_reads_request_cookie() {
        let req = TestRequest::default()
            .cookie(cookie(&[FlashMessage::info("hello")]))
            .to_http_request();
        assert_eq!(take(&req), vec![FlashMessage::info("hello")]);
        assert!(take(&TestRequest::default().to_http_request()).is_empty());
    }
}
