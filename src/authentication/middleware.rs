use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::constants::SESSION_COOKIE;

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Pulls the raw token from the `session` cookie, falling back to an
/// `Authorization: Token <jwt>` header.
fn with_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .map(|cookie: Option<String>, header: Option<String>| {
            cookie.or_else(|| header.as_deref().and_then(parse_authorization))
        })
}

pub fn parse_authorization(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    match scheme {
        "Token" | "Bearer" if !token.is_empty() => Some(token.to_string()),
        _ => None,
    }
}

pub fn with_auth(
    secret: Arc<String>,
) -> impl Filter<Extract = ((),), Error = Rejection> + Clone {
    with_session(secret).map(|_session: SessionData| ())
}

pub fn with_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            match token.map(|token| verify_jwt_session(&token, &secret)) {
                Some(Ok(data)) => Ok(SessionData::from(data)),
                _ => Err(warp::reject::custom(Unauthorized)),
            }
        }
    })
}

pub fn with_possible_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_token().map(move |token: Option<String>| {
        token
            .and_then(|token| verify_jwt_session(&token, &secret).ok())
            .map(SessionData::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc.def"), Some(String::from("abc.def")));
        assert_eq!(parse_authorization("Bearer abc"), Some(String::from("abc")));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token "), None);
    }
}
