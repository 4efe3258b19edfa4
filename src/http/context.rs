//! Request-scoped identity of the caller.
//!
//! Callers identify themselves through the `X-Sent-By` header, either as a
//! plain `joe01doe; type=adAccount` value or as a JWT whose `sub` claim holds
//! the user id. The token is not verified here; that happens at the gateway.
//! The parsed value travels down the call chain as an explicit argument.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::http::AppError;

pub const SENT_BY_HEADER: HeaderName = HeaderName::from_static("x-sent-by");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub sent_by: Option<String>,
}

impl RequestContext {
    pub fn author(&self) -> Option<&str> {
        self.sent_by.as_deref()
    }
}

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(SENT_BY_HEADER) else {
            return Ok(RequestContext::default());
        };
        let value = value
            .to_str()
            .map_err(|_| AppError::bad_request("invalid X-Sent-By header"))?;
        let sent_by = parse_sent_by(value)
            .map_err(|_| AppError::bad_request("invalid X-Sent-By header"))?;

        Ok(RequestContext { sent_by })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidSentBy;

pub fn parse_sent_by(value: &str) -> Result<Option<String>, InvalidSentBy> {
    let value = value.trim();
    if looks_like_jwt(value) {
        return subject_from_jwt(value);
    }

    let subject = value.split(';').next().unwrap_or_default().trim();
    if subject.is_empty() {
        Ok(None)
    } else {
        Ok(Some(subject.to_string()))
    }
}

/// Three dot-separated segments whose first one decodes to a JOSE header
/// with an `alg`. Dotted user ids such as `first.middle.last` fail the header
/// check and stay plain values.
fn looks_like_jwt(value: &str) -> bool {
    if value.contains(';') || value.contains(char::is_whitespace) {
        return false;
    }
    let mut segments = value.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return false;
    };
    URL_SAFE_NO_PAD
        .decode(header.trim_end_matches('='))
        .ok()
        .and_then(|decoded| serde_json::from_slice::<serde_json::Value>(&decoded).ok())
        .is_some_and(|header| header.get("alg").is_some_and(|alg| alg.is_string()))
}

fn subject_from_jwt(token: &str) -> Result<Option<String>, InvalidSentBy> {
    let payload = token.split('.').nth(1).ok_or(InvalidSentBy)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| InvalidSentBy)?;
    let claims: Claims = serde_json::from_slice(&decoded).map_err(|_| InvalidSentBy)?;

    Ok(claims
        .sub
        .map(|sub| sub.trim().to_string())
        .filter(|sub| !sub.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn plain_value_with_type_suffix() {
        assert_eq!(
            parse_sent_by("joe01doe; type=adAccount"),
            Ok(Some("joe01doe".to_string()))
        );
    }

    #[test]
    fn plain_value_without_suffix() {
        assert_eq!(parse_sent_by(" joe01doe "), Ok(Some("joe01doe".to_string())));
    }

    #[test]
    fn blank_value_has_no_subject() {
        assert_eq!(parse_sent_by(""), Ok(None));
        assert_eq!(parse_sent_by("; type=adAccount"), Ok(None));
    }

    #[test]
    fn jwt_subject_is_extracted() {
        let token = jwt(r#"{"sub":"joe01doe","iat":1700000000}"#);
        assert_eq!(parse_sent_by(&token), Ok(Some("joe01doe".to_string())));
    }

    #[test]
    fn jwt_without_subject_has_no_subject() {
        let token = jwt(r#"{"iat":1700000000}"#);
        assert_eq!(parse_sent_by(&token), Ok(None));
    }

    #[test]
    fn malformed_jwt_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        assert_eq!(parse_sent_by(&format!("{}.!!!.ccc", header)), Err(InvalidSentBy));
        let not_json = format!("{}.{}.y", header, URL_SAFE_NO_PAD.encode("not json"));
        assert_eq!(parse_sent_by(&not_json), Err(InvalidSentBy));
    }

    #[test]
    fn dotted_plain_value_with_type_is_not_a_jwt() {
        assert_eq!(
            parse_sent_by("first.middle.last; type=adAccount"),
            Ok(Some("first.middle.last".to_string()))
        );
    }

    #[test]
    fn dotted_plain_value_without_type_is_not_a_jwt() {
        assert_eq!(
            parse_sent_by("first.middle.last"),
            Ok(Some("first.middle.last".to_string()))
        );
        assert_eq!(parse_sent_by("aaa.!!!.ccc"), Ok(Some("aaa.!!!.ccc".to_string())));
    }

    #[test]
    fn header_without_alg_is_not_a_jwt() {
        let token = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"joe01doe"}"#)
        );
        assert_eq!(parse_sent_by(&token), Ok(Some(token.clone())));
    }
}
