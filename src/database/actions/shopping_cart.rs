use crate::{
    error::FoodgramError,
    schema::Uuid,
    shopping_list::{CartLine, ShoppingList},
};

use super::get_user_by_id;
use sqlx::{Pool, Postgres};

/// Aggregated ingredients of every recipe in the user's cart.
pub async fn fetch_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, FoodgramError> {
    if get_user_by_id(pool, user_id).await?.is_none() {
        return Err(FoodgramError::not_found("No user exists with specified id"));
    }

    let lines: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let list = ShoppingList::aggregate(lines);
    log::debug!("Shopping list of user {user_id} has {} item(s)", list.len());

    Ok(list)
}
