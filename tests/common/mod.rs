#![allow(dead_code)]

use foodgram_sdk::{
    actions::{create_ingredient, create_recipe, create_tag, register_user},
    schema::{
        Ingredient, IngredientDraft, IngredientLineInput, RecipeDetail, RecipeDraft, Tag,
        TagDraft, UserDraft, UserProfile, Uuid,
    },
};
use sqlx::PgPool;

pub async fn user(pool: &PgPool, username: &str) -> UserProfile {
    register_user(
        UserDraft {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::from("Test"),
            last_name: String::from("User"),
            password: String::from("hunter22"),
        },
        pool,
    )
    .await
    .unwrap()
}

pub async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Ingredient {
    create_ingredient(
        IngredientDraft {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        },
        pool,
    )
    .await
    .unwrap()
}

pub async fn tag(pool: &PgPool, slug: &str, color: &str) -> Tag {
    create_tag(
        TagDraft {
            name: slug.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        },
        pool,
    )
    .await
    .unwrap()
}

pub fn draft(name: &str, tags: Vec<Uuid>, lines: &[(Uuid, i32)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        text: String::from("Mix everything and bake."),
        image: String::from("recipes/images/test.png"),
        cooking_time: 30,
        tags,
        ingredients: lines
            .iter()
            .map(|(id, amount)| IngredientLineInput {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}

pub async fn recipe(
    pool: &PgPool,
    author: Uuid,
    name: &str,
    lines: &[(Uuid, i32)],
) -> RecipeDetail {
    create_recipe(author, draft(name, vec![], lines), pool)
        .await
        .unwrap()
}
