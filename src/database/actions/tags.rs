use crate::{
    error::FoodgramError,
    schema::{Tag, TagDraft, Uuid},
};

use sqlx::{PgExecutor, Pool, Postgres};

pub async fn create_tag(draft: TagDraft, pool: &Pool<Postgres>) -> Result<Tag, FoodgramError> {
    draft.validate()?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(draft.name.trim())
    .bind(draft.color.to_uppercase())
    .bind(draft.slug)
    .fetch_optional(pool)
    .await?;

    match tag {
        Some(tag) => {
            log::info!("Created tag {} ({})", tag.slug, tag.id);
            Ok(tag)
        }
        None => Err(FoodgramError::already_exists(
            "A tag with that name, color or slug already exists",
        )),
    }
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, FoodgramError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn find_tag(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, FoodgramError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, FoodgramError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags<'e, E>(executor: E, recipe_id: Uuid) -> Result<Vec<Tag>, FoodgramError>
where
    E: PgExecutor<'e>,
{
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.* FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await?;

    Ok(list)
}

pub async fn update_tag(
    id: Uuid,
    draft: TagDraft,
    pool: &Pool<Postgres>,
) -> Result<Tag, FoodgramError> {
    draft.validate()?;

    let tag: Option<Tag> =
        sqlx::query_as("UPDATE tags SET name = $1, color = $2, slug = $3 WHERE id = $4 RETURNING *")
            .bind(draft.name.trim())
            .bind(draft.color.to_uppercase())
            .bind(draft.slug)
            .bind(id)
            .fetch_optional(pool)
            .await?;

    tag.ok_or_else(|| FoodgramError::not_found("No tag exists with specified id"))
}

pub async fn delete_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<(), FoodgramError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() <= 0 {
        return Err(FoodgramError::not_found("No tag exists with specified id"));
    }

    log::info!("Deleted tag {id}");

    Ok(())
}
