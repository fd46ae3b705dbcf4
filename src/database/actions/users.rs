use crate::{
    authentication::cryptography::{hash_password, verify_password},
    config::Config,
    error::{FoodgramError, ValidationErrors},
    jwt::generate_jwt_session,
    pagination::{clamp_window, Page},
    schema::{User, UserDraft, UserProfile, Uuid},
};

use sqlx::{FromRow, PgExecutor, Pool, Postgres};

#[derive(FromRow)]
struct UserProfileRow {
    #[sqlx(flatten)]
    profile: UserProfile,
    count: i64,
}

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, FoodgramError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, FoodgramError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Profile of `user_id` as seen by `viewer`; `is_subscribed` is false for
/// anonymous viewers.
pub async fn get_user_profile<'e, E>(
    user_id: Uuid,
    viewer: Option<Uuid>,
    executor: E,
) -> Result<Option<UserProfile>, FoodgramError>
where
    E: PgExecutor<'e>,
{
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $2 AND f.following_id = u.id) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

pub async fn fetch_users(
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<Page<UserProfile>, FoodgramError> {
    let (limit, offset) = clamp_window(limit, offset);

    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.following_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_users(pool).await?,
        None => 0,
    };
    let rows = rows.into_iter().map(|row| row.profile).collect();

    Ok(Page::from_rows(rows, total_count, limit, offset))
}

async fn count_users(pool: &Pool<Postgres>) -> Result<i64, FoodgramError> {
    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(
    draft: UserDraft,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, FoodgramError> {
    draft.validate()?;

    let password = hash_password(&draft.password)?;

    let profile: Option<UserProfile> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING id, email, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(&draft.email)
    .bind(&draft.username)
    .bind(&draft.first_name)
    .bind(&draft.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await?;

    match profile {
        Some(profile) => {
            log::info!("Registered user {} ({})", profile.username, profile.id);
            Ok(profile)
        }
        None => Err(FoodgramError::already_exists(
            "A user with that username or email already exists",
        )),
    }
}

fn invalid_credentials() -> FoodgramError {
    let mut errors = ValidationErrors::new();
    errors.add(
        "non_field_errors",
        "Unable to log in with provided credentials.",
    );
    FoodgramError::Validation(errors)
}

pub async fn login_user(
    email: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let user = match get_user(pool, email).await? {
        Some(user) => user,
        None => {
            log::warn!("Rejected login for unknown email");
            return Err(invalid_credentials().into());
        }
    };

    if !verify_password(password, &user.password) {
        log::warn!("Rejected login for user {}", user.id);
        return Err(invalid_credentials().into());
    }

    generate_jwt_session(&user, config)
}

pub async fn set_password(
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| FoodgramError::not_found("No user exists with specified id"))?;

    let mut errors = ValidationErrors::new();
    if !verify_password(current_password, &user.password) {
        errors.add("current_password", "Invalid password.");
    }
    if new_password.is_empty() {
        errors.add("new_password", "This field may not be blank.");
    }
    errors.into_result()?;

    let password = hash_password(new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await?;

    log::info!("Password changed for user {user_id}");

    Ok(())
}
