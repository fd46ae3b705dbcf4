pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const RECIPE_TEXT_MAX_LENGTH: usize = 2000;
pub const TAG_FIELD_MAX_LENGTH: usize = 150;
pub const INGREDIENT_FIELD_MAX_LENGTH: usize = 150;
pub const USER_FIELD_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const SESSION_COOKIE: &str = "session";
