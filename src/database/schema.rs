use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::{
        EMAIL_MAX_LENGTH, INGREDIENT_FIELD_MAX_LENGTH, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
        RECIPE_NAME_MAX_LENGTH, RECIPE_TEXT_MAX_LENGTH, TAG_FIELD_MAX_LENGTH,
        USER_FIELD_MAX_LENGTH,
    },
    error::{TypeError, ValidationErrors},
};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => return Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

/// The three kinds of user-owned relationship records. All of them share one
/// contract: at most one record per `(user, target)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Follow,
}

impl TryFrom<Value> for RelationKind {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "favorite" => Ok(Self::Favorite),
                "shopping_cart" => Ok(Self::ShoppingCart),
                "follow" => Ok(Self::Follow),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => return Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

/// Public view of a user, relative to whoever is looking at it.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDraft {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !is_email(&self.email) {
            errors.add("email", "Enter a valid email address.");
        }
        if self.email.chars().count() > EMAIL_MAX_LENGTH {
            errors.add(
                "email",
                format!("Ensure this field has no more than {EMAIL_MAX_LENGTH} characters."),
            );
        }

        for (field, value) in [
            ("username", &self.username),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            check_text(&mut errors, field, value, USER_FIELD_MAX_LENGTH);
        }

        if self
            .username
            .chars()
            .any(|c| !(c.is_alphanumeric() || "@.+-_".contains(c)))
        {
            errors.add(
                "username",
                "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if self.password.is_empty() {
            errors.add("password", "This field may not be blank.");
        }

        errors.into_result()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "name", &self.name, TAG_FIELD_MAX_LENGTH);

        if !is_hex_color(&self.color) {
            errors.add("color", "Enter a valid HEX color, e.g. #E26C2D.");
        }

        check_text(&mut errors, "slug", &self.slug, TAG_FIELD_MAX_LENGTH);
        if !self.slug.is_empty() && !is_slug(&self.slug) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }

        errors.into_result()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientDraft {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "name", &self.name, INGREDIENT_FIELD_MAX_LENGTH);
        check_text(
            &mut errors,
            "measurement_unit",
            &self.measurement_unit,
            INGREDIENT_FIELD_MAX_LENGTH,
        );

        errors.into_result()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// One ingredient line of a recipe joined with the ingredient it points to.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeIngredient {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IngredientLineInput {
    pub id: Uuid,
    pub amount: i32,
}

/// Full writable state of a recipe. Used for both create and update, since an
/// update replaces tags and ingredient lines wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<IngredientLineInput>,
}

impl RecipeDraft {
    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "name", &self.name, RECIPE_NAME_MAX_LENGTH);
        check_text(&mut errors, "text", &self.text, RECIPE_TEXT_MAX_LENGTH);

        if self.image.trim().is_empty() {
            errors.add("image", "This field may not be blank.");
        }

        if self.cooking_time < MIN_COOKING_TIME {
            errors.add(
                "cooking_time",
                format!("Ensure this value is greater than or equal to {MIN_COOKING_TIME}."),
            );
        }

        if self.ingredients.is_empty() {
            errors.add("ingredients", "At least one ingredient is required.");
        }

        let mut seen_ingredients = HashSet::new();
        for (i, line) in self.ingredients.iter().enumerate() {
            if line.amount < MIN_INGREDIENT_AMOUNT {
                errors.add(
                    format!("ingredients[{i}].amount"),
                    format!(
                        "Ensure this value is greater than or equal to {MIN_INGREDIENT_AMOUNT}."
                    ),
                );
            }
            if !seen_ingredients.insert(line.id) {
                errors.add(
                    "ingredients",
                    format!("Ingredient {} is listed more than once.", line.id),
                );
            }
        }

        let mut seen_tags = HashSet::new();
        for tag in self.tags.iter() {
            if !seen_tags.insert(*tag) {
                errors.add("tags", format!("Tag {tag} is listed more than once."));
            }
        }

        errors.into_result()
    }

    pub fn ingredient_ids(&self) -> Vec<Uuid> {
        self.ingredients.iter().map(|line| line.id).collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Relation {
    pub kind: RelationKind,
    pub user_id: Uuid,
    pub target_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

fn check_text(errors: &mut ValidationErrors, field: &str, value: &str, max_length: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters."),
        );
    }
}

pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            (digits.len() == 3 || digits.len() == 6)
                && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(cooking_time: i32, ingredients: Vec<IngredientLineInput>) -> RecipeDraft {
        RecipeDraft {
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            image: String::from("media/pancakes.png"),
            cooking_time,
            tags: vec![1],
            ingredients,
        }
    }

    fn line(id: Uuid, amount: i32) -> IngredientLineInput {
        IngredientLineInput { id, amount }
    }

    #[test]
    fn test_zero_cooking_time_is_rejected() {
        let errors = draft(0, vec![line(1, 100)]).validate().unwrap_err();

        assert!(errors.contains("cooking_time"));
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn test_valid_draft_with_two_lines() {
        let recipe = draft(30, vec![line(1, 100), line(2, 2)]);

        assert!(recipe.validate().is_ok());
        assert_eq!(recipe.ingredient_ids(), vec![1, 2]);
    }

    #[test]
    fn test_every_violation_is_reported() {
        let mut recipe = draft(0, vec![line(1, 0), line(1, 5)]);
        recipe.name = String::from("   ");
        recipe.tags = vec![3, 3];

        let errors = recipe.validate().unwrap_err();

        assert!(errors.contains("name"));
        assert!(errors.contains("cooking_time"));
        assert!(errors.contains("ingredients[0].amount"));
        assert!(errors.contains("ingredients"));
        assert!(errors.contains("tags"));
        assert!(!errors.contains("ingredients[1].amount"));
    }

    #[test]
    fn test_recipe_without_ingredients_is_rejected() {
        let errors = draft(10, vec![]).validate().unwrap_err();

        assert!(errors.contains("ingredients"));
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let mut recipe = draft(10, vec![line(1, 1)]);
        recipe.name = "a".repeat(RECIPE_NAME_MAX_LENGTH + 1);

        assert!(recipe.validate().unwrap_err().contains("name"));
    }

    #[test]
    fn test_recipe_draft_deserializes_without_tags() {
        let recipe: RecipeDraft = serde_json::from_value(serde_json::json!({
            "name": "Soup",
            "text": "Boil.",
            "image": "media/soup.png",
            "cooking_time": 40,
            "ingredients": [{ "id": 4, "amount": 300 }]
        }))
        .unwrap();

        assert!(recipe.tags.is_empty());
        assert_eq!(recipe.ingredients, vec![line(4, 300)]);
    }

    #[test]
    fn test_tag_draft_validation() {
        let tag = TagDraft {
            name: String::from("Breakfast"),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        };
        assert!(tag.validate().is_ok());

        let tag = TagDraft {
            name: String::new(),
            color: String::from("E26C2D"),
            slug: String::from("break fast"),
        };
        let errors = tag.validate().unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("color"));
        assert!(errors.contains("slug"));
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#49B64E"));
        assert!(!is_hex_color("#49B64"));
        assert!(!is_hex_color("#GGGGGG"));
        assert!(!is_hex_color("49B64E"));
    }

    #[test]
    fn test_user_draft_validation() {
        let user = UserDraft {
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            password: String::from("hunter2"),
        };
        assert!(user.validate().is_ok());

        let user = UserDraft {
            email: String::from("not-an-email"),
            username: String::from("bad name"),
            first_name: String::new(),
            last_name: String::from("Lovelace"),
            password: String::new(),
        };
        let errors = user.validate().unwrap_err();
        assert!(errors.contains("email"));
        assert!(errors.contains("username"));
        assert!(errors.contains("first_name"));
        assert!(errors.contains("password"));
        assert!(!errors.contains("last_name"));
    }

    #[test]
    fn test_relation_kind_from_value() {
        assert_eq!(
            RelationKind::try_from(Value::from("shopping_cart")).unwrap(),
            RelationKind::ShoppingCart
        );
        assert!(RelationKind::try_from(Value::from("cart")).is_err());
    }
}
