use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use potion::{Error, HtmlError};
use serde::Serialize;
use warp::reject::Rejection;

/// Field level validation failures, keyed by field name.
///
/// Every violated field is collected before the error is returned, so a client
/// gets the whole list in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(|messages| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|field| field.as_str())
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<String>>()
            .join("; ");

        write!(f, "{fields}")
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, thiserror::Error)]
pub enum FoodgramError {
    #[error("Invalid data ({0})")]
    Validation(ValidationErrors),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidSelfReference(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl FoodgramError {
    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn already_exists(info: &str) -> Self {
        Self::AlreadyExists(info.to_string())
    }
}

impl From<ValidationErrors> for FoodgramError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<sqlx::Error> for FoodgramError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::not_found("Requested row does not exist"),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                log::debug!("Unique constraint rejected write: {e}");
                Self::AlreadyExists(format!("{}", e.message()))
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
                log::debug!("Foreign key rejected write: {e}");
                Self::NotFound(format!("{}", e.message()))
            }
            sqlx::Error::Database(e) if e.is_check_violation() => {
                let mut errors = ValidationErrors::new();
                errors.add(
                    e.constraint().unwrap_or("non_field_errors"),
                    e.message().to_string(),
                );
                Self::Validation(errors)
            }
            e => {
                log::error!("Query failed: {e}");
                Self::Query(format!("{e}"))
            }
        }
    }
}

impl From<FoodgramError> for Error {
    fn from(value: FoodgramError) -> Self {
        match value {
            FoodgramError::Validation(errors) => {
                let info = serde_json::to_string(&errors).unwrap_or_else(|_| errors.to_string());
                HtmlError::InvalidRequest.new(&info)
            }
            FoodgramError::AlreadyExists(info) | FoodgramError::InvalidSelfReference(info) => {
                HtmlError::InvalidRequest.new(&info)
            }
            FoodgramError::Unauthorized(info) => HtmlError::Unauthorized.new(&info),
            FoodgramError::NotFound(info) => Error {
                code: 404,
                info: Some(info),
                redirect: None,
            },
            FoodgramError::Query(info) => Error {
                code: 500,
                info: Some(info),
                redirect: None,
            },
        }
    }
}

impl From<FoodgramError> for Rejection {
    fn from(value: FoodgramError) -> Self {
        let error: Error = value.into();
        error.into()
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Into<potion::Error> for TypeError {
    fn into(self) -> potion::Error {
        HtmlError::InvalidRequest.new(&self.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
impl Into<Rejection> for TypeError {
    fn into(self) -> Rejection {
        HtmlError::InvalidRequest.new(&self.info).into()
    }
}
