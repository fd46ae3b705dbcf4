use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::{FoodgramError, TypeError, ValidationErrors},
    form::Form,
    jwt::SessionData,
    pagination::{clamp_window, Page},
    schema::{
        IngredientLineInput, Recipe, RecipeDetail, RecipeDraft, RecipeIngredient, RecipeRow, Uuid,
    },
};

use super::{get_user_profile, list_recipe_tags};
use sqlx::{PgConnection, PgExecutor, Pool, Postgres, QueryBuilder};

/// Filters for the recipe listing. Multiple tag slugs match any of them.
/// The favorite and cart flags are relative to the viewer and are ignored
/// for anonymous viewers.
#[derive(Debug, Clone)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecipeQuery {
    fn default() -> Self {
        Self {
            author: None,
            tags: vec![],
            is_favorited: false,
            is_in_shopping_cart: false,
            limit: RECIPE_COUNT_PER_PAGE,
            offset: 0,
        }
    }
}

impl RecipeQuery {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, potion::Error> {
        let (limit, offset) = clamp_window(
            form.get_optional_number::<i64>("limit")?.unwrap_or(default_limit),
            form.get_optional_number::<i64>("offset")?.unwrap_or(0),
        );

        Ok(Self {
            author: form.get_optional_number("author")?,
            tags: form
                .get_list("tags")
                .map_err(|e: TypeError| -> potion::Error { e.into() })?,
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
            limit,
            offset,
        })
    }
}

/// Appends the `WHERE` conditions of `query`. The recipes table is aliased `r`.
fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &RecipeQuery,
    viewer: Option<Uuid>,
) {
    builder.push(" WHERE TRUE");

    if let Some(author) = query.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !query.tags.is_empty() {
        builder
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(query.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if query.is_favorited {
            builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if query.is_in_shopping_cart {
            builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }
}

async fn count_recipes(
    query: &RecipeQuery,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<i64, FoodgramError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut builder, query, viewer);

    let result: (i64,) = builder.build_query_as().fetch_one(pool).await?;

    Ok(result.0)
}

pub async fn fetch_recipes(
    query: &RecipeQuery,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeRow>, FoodgramError> {
    let (limit, offset) = clamp_window(query.limit, query.offset);

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(
        ") AS is_favorited, EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r");

    push_filters(&mut builder, query, viewer);

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    log::debug!("Fetching recipes: {}", builder.sql());

    let rows: Vec<RecipeRow> = builder.build_query_as().fetch_all(pool).await?;

    // the window total is only there when the page has rows
    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_recipes(query, viewer, pool).await?,
        None => 0,
    };

    Ok(Page::from_rows(rows, total_count, limit, offset))
}

pub async fn list_recipe_ingredients<'e, E>(
    executor: E,
    recipe_id: Uuid,
) -> Result<Vec<RecipeIngredient>, FoodgramError>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

pub async fn find_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, FoodgramError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Full read model of a recipe as seen by `viewer`.
pub async fn get_recipe(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, FoodgramError> {
    let recipe = match find_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let mut conn = pool.acquire().await?;
    let detail = load_recipe_detail(recipe, viewer, &mut conn).await?;

    Ok(Some(detail))
}

/// Loads the recipe only if `session` may modify it: its author, or anyone
/// allowed to manage all recipes.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, FoodgramError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match find_recipe(id, pool).await? {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id, ActionType::ManageAllRecipes)?;
            Ok(recipe)
        }
        None => Err(FoodgramError::not_found("No recipe exists with specified id")),
    }
}

async fn load_recipe_detail(
    recipe: Recipe,
    viewer: Option<Uuid>,
    conn: &mut PgConnection,
) -> Result<RecipeDetail, FoodgramError> {
    let author = get_user_profile(recipe.author_id, viewer, &mut *conn)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Recipe author no longer exists"))?;
    let tags = list_recipe_tags(&mut *conn, recipe.id).await?;
    let ingredients = list_recipe_ingredients(&mut *conn, recipe.id).await?;

    let flags: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2),
            EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2)
    ",
    )
    .bind(viewer)
    .bind(recipe.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(RecipeDetail {
        recipe,
        author,
        tags,
        ingredients,
        is_favorited: flags.0,
        is_in_shopping_cart: flags.1,
    })
}

/// Adds an error for every referenced tag or ingredient that does not exist.
/// Referenced rows are share-locked until the transaction ends.
async fn check_references(
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<ValidationErrors, FoodgramError> {
    let mut errors = ValidationErrors::new();

    let tags: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1) FOR SHARE")
        .bind(&draft.tags)
        .fetch_all(&mut *conn)
        .await?;
    let tags: HashSet<Uuid> = tags.into_iter().map(|row| row.0).collect();
    for id in draft.tags.iter().filter(|id| !tags.contains(id)) {
        errors.add("tags", format!("Invalid pk \"{id}\" - object does not exist."));
    }

    let ingredient_ids = draft.ingredient_ids();
    let ingredients: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1) FOR SHARE")
            .bind(&ingredient_ids)
            .fetch_all(&mut *conn)
            .await?;
    let ingredients: HashSet<Uuid> = ingredients.into_iter().map(|row| row.0).collect();
    for id in ingredient_ids.iter().filter(|id| !ingredients.contains(id)) {
        errors.add(
            "ingredients",
            format!("Invalid pk \"{id}\" - object does not exist."),
        );
    }

    Ok(errors)
}

/// Runs field validation and reference checks together so that every
/// violation is reported in one error.
async fn validate_draft(draft: &RecipeDraft, conn: &mut PgConnection) -> Result<(), FoodgramError> {
    let mut errors = match draft.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };
    errors.merge(check_references(draft, conn).await?);

    Ok(errors.into_result()?)
}

async fn insert_recipe_tags(
    recipe_id: Uuid,
    tags: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), FoodgramError> {
    if tags.len() > 0 {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

async fn insert_recipe_ingredients(
    recipe_id: Uuid,
    lines: &[IngredientLineInput],
    conn: &mut PgConnection,
) -> Result<(), FoodgramError> {
    if lines.len() > 0 {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

        query_builder.push_values(lines.iter(), |mut b, line| {
            b.push_bind(recipe_id)
                .push_bind(line.id)
                .push_bind(line.amount);
        });

        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

/// Creates a recipe with its tag set and ingredient lines in one transaction.
pub async fn create_recipe(
    author_id: Uuid,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    let mut tx = pool.begin().await?;

    validate_draft(&draft, &mut tx).await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(author_id)
    .bind(draft.name.trim())
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    insert_recipe_tags(recipe.id, &draft.tags, &mut tx).await?;
    insert_recipe_ingredients(recipe.id, &draft.ingredients, &mut tx).await?;

    let detail = load_recipe_detail(recipe, Some(author_id), &mut tx).await?;
    tx.commit().await?;

    log::info!(
        "Created recipe {} ({}) with {} ingredient(s)",
        detail.recipe.name,
        detail.recipe.id,
        detail.ingredients.len()
    );

    Ok(detail)
}

/// Replaces the full state of a recipe. Tags and ingredient lines are
/// replaced wholesale inside the same transaction as the field update, so
/// readers never see the recipe without lines.
pub async fn update_recipe(
    recipe_id: Uuid,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    let mut tx = pool.begin().await?;

    validate_draft(&draft, &mut tx).await?;

    let recipe: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(draft.name.trim())
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .bind(recipe_id)
    .fetch_optional(&mut *tx)
    .await?;

    let recipe =
        recipe.ok_or_else(|| FoodgramError::not_found("No recipe exists with specified id"))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    insert_recipe_tags(recipe_id, &draft.tags, &mut tx).await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    insert_recipe_ingredients(recipe_id, &draft.ingredients, &mut tx).await?;

    let author_id = recipe.author_id;
    let detail = load_recipe_detail(recipe, Some(author_id), &mut tx).await?;
    tx.commit().await?;

    log::info!(
        "Updated recipe {} ({}) with {} ingredient(s)",
        detail.recipe.name,
        recipe_id,
        detail.ingredients.len()
    );

    Ok(detail)
}

/// Deletes a recipe; its lines, tag links, favorites and cart entries cascade.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF, see `get_recipe_mut`
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), FoodgramError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() <= 0 {
        return Err(FoodgramError::not_found("No recipe exists with specified id"));
    }

    log::info!("Deleted recipe {id}");

    Ok(())
}
