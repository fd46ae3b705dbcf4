use crate::{
    error::{FoodgramError, ValidationErrors},
    schema::{Ingredient, IngredientDraft, Uuid},
};

use sqlx::{Pool, Postgres};

/// Lists ingredients ordered by name. `search` matches a case-insensitive
/// name prefix.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, FoodgramError> {
    let rows: Vec<Ingredient> = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => {
            sqlx::query_as(
                "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) || '%' ORDER BY name, id",
            )
            .bind(escape_like(search))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, FoodgramError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn create_ingredient(
    draft: IngredientDraft,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, FoodgramError> {
    draft.validate()?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(draft.name.trim())
    .bind(draft.measurement_unit.trim())
    .fetch_one(pool)
    .await?;

    log::info!("Created ingredient {} ({})", ingredient.name, ingredient.id);

    Ok(ingredient)
}

pub async fn update_ingredient(
    id: Uuid,
    draft: IngredientDraft,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, FoodgramError> {
    draft.validate()?;

    let ingredient: Option<Ingredient> = sqlx::query_as(
        "UPDATE ingredients SET name = $1, measurement_unit = $2 WHERE id = $3 RETURNING *",
    )
    .bind(draft.name.trim())
    .bind(draft.measurement_unit.trim())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    ingredient.ok_or_else(|| FoodgramError::not_found("No ingredient exists with specified id"))
}

/// Ingredients are shared between recipes, so one still in use is refused.
pub async fn delete_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<(), FoodgramError> {
    let usage: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM recipe_ingredients WHERE ingredient_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

    if usage.0 > 0 {
        let mut errors = ValidationErrors::new();
        errors.add(
            "ingredient",
            format!("Ingredient is used by {} recipe(s).", usage.0),
        );
        return Err(errors.into());
    }

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| match FoodgramError::from(e) {
            // a recipe picked it up between the check and the delete
            FoodgramError::NotFound(_) => {
                let mut errors = ValidationErrors::new();
                errors.add("ingredient", "Ingredient is used by a recipe.");
                FoodgramError::Validation(errors)
            }
            e => e,
        })?;

    if result.rows_affected() <= 0 {
        return Err(FoodgramError::not_found(
            "No ingredient exists with specified id",
        ));
    }

    log::info!("Deleted ingredient {id}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_raw\\"), "100\\%\\_raw\\\\");
        assert_eq!(escape_like("flour"), "flour");
    }
}
