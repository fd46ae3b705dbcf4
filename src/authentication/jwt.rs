use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::config::Config;
use crate::database::schema::User;
use crate::error::FoodgramError;
use crate::schema::UserRole;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), FoodgramError> {
        if !action.authenticate(self) {
            return Err(FoodgramError::Unauthorized(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }

    /// Owners may always act on their own content; everyone else needs `action`.
    pub fn authenticate_owner(&self, owner_id: i32, action: ActionType) -> Result<(), FoodgramError> {
        if owner_id == self.user_id {
            return Ok(());
        }
        self.authenticate(action)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| HtmlError::InternalServerError.new("Invalid session key"))
}

pub fn generate_jwt_session(user: &User, config: &Config) -> Result<String, potion::Error> {
    let key = signing_key(&config.jwt_secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        config.session_lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to sign session"))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
            }
            return Ok(session);
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(lifetime_hours: i64) -> Config {
        Config {
            database_url: String::from("postgres://localhost/foodgram"),
            database_max_connections: 1,
            jwt_secret: String::from("test-secret"),
            session_lifetime_hours: lifetime_hours,
            page_size: 6,
        }
    }

    fn user() -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            password: String::new(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_session_survives_signing() {
        let token = generate_jwt_session(&user(), &config(1)).ok().unwrap();
        let session: SessionData = verify_jwt_session(&token, "test-secret").ok().unwrap().into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "cook");
        assert!(session.is_admin);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = generate_jwt_session(&user(), &config(1)).ok().unwrap();

        assert!(verify_jwt_session(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let token = generate_jwt_session(&user(), &config(-1)).ok().unwrap();

        assert!(verify_jwt_session(&token, "test-secret").is_err());
    }

    #[test]
    fn test_owner_is_always_allowed() {
        let session = SessionData {
            user_id: 3,
            username: String::from("cook"),
            role: UserRole::User,
            is_admin: false,
        };

        assert!(session
            .authenticate_owner(3, ActionType::ManageAllRecipes)
            .is_ok());
        assert!(matches!(
            session.authenticate_owner(4, ActionType::ManageAllRecipes),
            Err(FoodgramError::Unauthorized(_))
        ));
    }
}
