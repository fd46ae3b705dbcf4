mod common;

use foodgram_sdk::{
    actions::{fetch_users, get_user, register_user},
    error::FoodgramError,
    schema::UserDraft,
};
use sqlx::PgPool;

fn draft(email: &str, username: &str) -> UserDraft {
    UserDraft {
        email: email.to_string(),
        username: username.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::from("hunter22"),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_email_is_unique_regardless_of_case(pool: PgPool) {
    register_user(draft("Cook@example.com", "cook1"), &pool)
        .await
        .unwrap();

    let second = register_user(draft("cook@example.com", "cook2"), &pool).await;
    assert!(matches!(second, Err(FoodgramError::AlreadyExists(_))));

    let user = get_user(&pool, "COOK@example.com").await.unwrap().unwrap();
    assert_eq!(user.username, "cook1");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_duplicate_username(pool: PgPool) {
    common::user(&pool, "cook").await;

    let second = register_user(draft("other@example.com", "cook"), &pool).await;
    assert!(matches!(second, Err(FoodgramError::AlreadyExists(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_user_listing_window(pool: PgPool) {
    common::user(&pool, "alice").await;
    common::user(&pool, "bob").await;

    let page = fetch_users(None, -3, -1, &pool).await.unwrap();
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.count, 2);

    let page = fetch_users(None, 6, 20, &pool).await.unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.count, 2);
}
