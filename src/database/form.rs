use std::{collections::HashMap, str::FromStr};

use potion::Error;
use serde_json::Value;

use super::error::TypeError;

pub type FormData = HashMap<String, Value>;

/// Loosely typed request data, as decoded from a query string or a form body.
/// Values may arrive as JSON scalars or as their string representation.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => parse_scalar(value).map_err(|e| e.into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_optional_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => parse_scalar(value).map(Some).map_err(|e| e.into()),
        }
    }

    /// Flags accept `true`/`false` as well as the `1`/`0` used by query strings.
    pub fn get_flag(&self, key: &str) -> Result<bool, Error> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(value)) => Ok(*value),
            Some(value) => match scalar_to_string(value).as_deref() {
                Some("1") | Some("true") => Ok(true),
                Some("0") | Some("false") | Some("") => Ok(false),
                _ => Err(TypeError::new("Invalid flag").into()),
            },
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    /// Multi-valued keys arrive either as an array or as a single scalar.
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(vec![]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    scalar_to_string(value).ok_or_else(|| TypeError::new("Invalid list item"))
                })
                .collect(),
            Some(value) => scalar_to_string(value)
                .map(|value| vec![value])
                .ok_or_else(|| TypeError::new("Invalid list")),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(v) => Some(v.to_owned()),
        Value::Number(v) => Some(v.to_string()),
        Value::Bool(v) => Some(v.to_string()),
        _ => None,
    }
}

fn parse_scalar<T: FromStr>(value: &Value) -> Result<T, TypeError> {
    match scalar_to_string(value) {
        Some(v) => v
            .parse()
            .map_err(|_e| TypeError::new("Invalid type conversion")),
        None => Err(TypeError::new("Failed to parse value as str")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: Value) -> Form {
        let data: FormData = serde_json::from_value(value).unwrap();
        Form::from_data(data)
    }

    #[test]
    fn test_numbers_parse_from_strings_and_json() {
        let form = form(json!({ "author": "4", "limit": 10 }));

        assert_eq!(form.get_number::<i32>("author").ok(), Some(4));
        assert_eq!(form.get_optional_number::<i64>("limit").ok(), Some(Some(10)));
        assert_eq!(form.get_optional_number::<i64>("offset").ok(), Some(None));
    }

    #[test]
    fn test_flags() {
        let form = form(json!({ "is_favorited": "1", "is_in_shopping_cart": false }));

        assert_eq!(form.get_flag("is_favorited").ok(), Some(true));
        assert_eq!(form.get_flag("is_in_shopping_cart").ok(), Some(false));
        assert_eq!(form.get_flag("missing").ok(), Some(false));
        assert!(form_with_flag("maybe").get_flag("flag").is_err());
    }

    fn form_with_flag(value: &str) -> Form {
        form(json!({ "flag": value }))
    }

    #[test]
    fn test_list_accepts_array_or_scalar() {
        let form = form(json!({ "tags": ["breakfast", "lunch"], "tag": "dinner" }));

        assert_eq!(form.get_list("tags").unwrap(), vec!["breakfast", "lunch"]);
        assert_eq!(form.get_list("tag").unwrap(), vec!["dinner"]);
        assert!(form.get_list("none").unwrap().is_empty());
    }
}
