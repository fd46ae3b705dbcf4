use std::collections::HashMap;

use sqlx::{FromRow, Pool, Postgres};

use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::FoodgramError,
    form::Form,
    pagination::{clamp_window, Page},
    schema::{RecipeShort, Relation, RelationKind, Subscription, UserProfile, Uuid},
};

impl RelationKind {
    fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Follow => "follows",
        }
    }

    fn target_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipe_id",
            RelationKind::Follow => "following_id",
        }
    }

    fn target_table(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipes",
            RelationKind::Follow => "users",
        }
    }

    fn duplicate_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::ShoppingCart => "Recipe is already in the shopping cart",
            RelationKind::Follow => "You are already subscribed to this user",
        }
    }

    fn missing_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is not in favorites",
            RelationKind::ShoppingCart => "Recipe is not in the shopping cart",
            RelationKind::Follow => "You are not subscribed to this user",
        }
    }

    fn missing_target_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => {
                "No recipe exists with specified id"
            }
            RelationKind::Follow => "No user exists with specified id",
        }
    }

    /// Rejects pairs that may never exist, independent of stored state.
    pub fn check_pair(&self, user_id: Uuid, target_id: Uuid) -> Result<(), FoodgramError> {
        match self {
            RelationKind::Follow if user_id == target_id => Err(
                FoodgramError::InvalidSelfReference(String::from("You can't subscribe to yourself")),
            ),
            _ => Ok(()),
        }
    }
}

/// Records `(user_id, target_id)` for `kind`. The unique constraint on the
/// pair decides between concurrent adds: the loser gets `AlreadyExists`.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Uuid,
    target_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Relation, FoodgramError> {
    kind.check_pair(user_id, target_id)?;

    let target: Option<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE id = $1",
        kind.target_table()
    ))
    .bind(target_id)
    .fetch_optional(pool)
    .await?;

    if target.is_none() {
        return Err(FoodgramError::not_found(kind.missing_target_message()));
    }

    let row: Option<(Uuid, Uuid)> = sqlx::query_as(&format!(
        "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING user_id, {column}",
        table = kind.table(),
        column = kind.target_column(),
    ))
    .bind(user_id)
    .bind(target_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| match FoodgramError::from(e) {
        FoodgramError::NotFound(_) => FoodgramError::not_found(kind.missing_target_message()),
        FoodgramError::AlreadyExists(_) => FoodgramError::already_exists(kind.duplicate_message()),
        e => e,
    })?;

    match row {
        Some((user_id, target_id)) => {
            log::info!("Added {kind:?} ({user_id}, {target_id})");
            Ok(Relation {
                kind,
                user_id,
                target_id,
            })
        }
        None => Err(FoodgramError::already_exists(kind.duplicate_message())),
    }
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Uuid,
    target_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await?;

    if result.rows_affected() <= 0 {
        return Err(FoodgramError::not_found(kind.missing_message()));
    }

    log::info!("Removed {kind:?} ({user_id}, {target_id})");

    Ok(())
}

pub async fn has_relation(
    kind: RelationKind,
    user_id: Uuid,
    target_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, FoodgramError> {
    let result: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

pub async fn count_relations(
    kind: RelationKind,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<i64, FoodgramError> {
    let result: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        kind.table()
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

#[derive(FromRow)]
struct SubscriptionRow {
    #[sqlx(flatten)]
    author: UserProfile,
    recipes_count: i64,
    count: i64,
}

#[derive(FromRow)]
struct AuthorRecipeRow {
    #[sqlx(flatten)]
    recipe: RecipeShort,
    author_id: Uuid,
}

/// Newest recipes of each author, at most `recipes_limit` per author when set.
async fn list_author_recipes(
    author_ids: &[Uuid],
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipeShort>>, FoodgramError> {
    let rows: Vec<AuthorRecipeRow> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time, author_id FROM (
            SELECT r.id, r.name, r.image, r.cooking_time, r.author_id,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(author_ids)
    .bind(recipes_limit.map(|l| l.max(0)))
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.author_id).or_default().push(row.recipe);
    });

    Ok(hashmap)
}

/// Paging of the follow list. `recipes_limit` caps the recipe preview of
/// each author; without it every recipe is listed.
#[derive(Debug, Clone)]
pub struct SubscriptionQuery {
    pub recipes_limit: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SubscriptionQuery {
    fn default() -> Self {
        Self {
            recipes_limit: None,
            limit: SUBSCRIPTION_COUNT_PER_PAGE,
            offset: 0,
        }
    }
}

impl SubscriptionQuery {
    pub fn from_form(form: &Form) -> Result<Self, potion::Error> {
        let (limit, offset) = clamp_window(
            form.get_optional_number::<i64>("limit")?.unwrap_or(SUBSCRIPTION_COUNT_PER_PAGE),
            form.get_optional_number::<i64>("offset")?.unwrap_or(0),
        );

        Ok(Self {
            recipes_limit: form
                .get_optional_number::<i64>("recipes_limit")?
                .map(|l| l.max(0)),
            limit,
            offset,
        })
    }
}

/// Authors `user_id` follows, each with a preview of their recipes.
pub async fn fetch_subscriptions(
    user_id: Uuid,
    query: &SubscriptionQuery,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, FoodgramError> {
    let (limit, offset) = clamp_window(query.limit, query.offset);

    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, TRUE AS is_subscribed,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.following_id
        WHERE f.user_id = $1
        ORDER BY f.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_relations(RelationKind::Follow, user_id, pool).await?,
        None => 0,
    };
    let author_ids: Vec<Uuid> = rows.iter().map(|row| row.author.id).collect();
    let mut recipes = list_author_recipes(&author_ids, query.recipes_limit, pool).await?;

    let rows = rows
        .into_iter()
        .map(|row| Subscription {
            recipes: recipes.remove(&row.author.id).unwrap_or_default(),
            recipes_count: row.recipes_count,
            author: row.author,
        })
        .collect();

    Ok(Page::from_rows(rows, total_count, limit, offset))
}

/// Single subscription entry, as returned after a successful follow.
pub async fn get_subscription(
    user_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, FoodgramError> {
    let row: Option<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, TRUE AS is_subscribed,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            1::BIGINT AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.following_id
        WHERE f.user_id = $1 AND f.following_id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| FoodgramError::not_found(RelationKind::Follow.missing_message()))?;
    let mut recipes = list_author_recipes(&[author_id], recipes_limit, pool).await?;

    Ok(Subscription {
        recipes: recipes.remove(&author_id).unwrap_or_default(),
        recipes_count: row.recipes_count,
        author: row.author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_follow_is_rejected() {
        assert!(matches!(
            RelationKind::Follow.check_pair(5, 5),
            Err(FoodgramError::InvalidSelfReference(_))
        ));
        assert!(RelationKind::Follow.check_pair(5, 6).is_ok());
    }

    #[test]
    fn test_recipe_relations_have_no_self_rule() {
        // user ids and recipe ids live in different id spaces
        assert!(RelationKind::Favorite.check_pair(5, 5).is_ok());
        assert!(RelationKind::ShoppingCart.check_pair(5, 5).is_ok());
    }

    #[test]
    fn test_subscription_query_from_form() {
        let data: crate::form::FormData = serde_json::from_value(serde_json::json!({
            "recipes_limit": "2",
            "limit": "-3",
            "offset": "12"
        }))
        .unwrap();
        let query = SubscriptionQuery::from_form(&Form::from_data(data)).ok().unwrap();

        assert_eq!(query.recipes_limit, Some(2));
        assert_eq!(query.limit, 1);
        assert_eq!(query.offset, 12);

        let query = SubscriptionQuery::from_form(&Form::from_data(Default::default()))
            .ok()
            .unwrap();
        assert_eq!(query.recipes_limit, None);
        assert_eq!(query.limit, SUBSCRIPTION_COUNT_PER_PAGE);
    }

    #[test]
    fn test_kinds_map_to_their_tables() {
        assert_eq!(RelationKind::Favorite.table(), "favorites");
        assert_eq!(RelationKind::ShoppingCart.table(), "shopping_cart");
        assert_eq!(RelationKind::Follow.table(), "follows");
        assert_eq!(RelationKind::Follow.target_column(), "following_id");
        assert_eq!(RelationKind::ShoppingCart.target_table(), "recipes");
    }
}
