use std::{str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    structs::{Category, Expense, ExpenseChanges, NewExpense, User},
    utils::hash_password,
    AppState,
};

/// Opens (creating if needed) the database and applies pending migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts).await?;
    sqlx::migrate!().run(&db_pool).await?;
    log::info!("Database migrated successfully");
    Ok(db_pool)
}

pub async fn get_user_by_id(state: &AppState, id: i64) -> Result<Option<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

/// `email` must already be normalized.
pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

pub async fn create_user(
    state: &AppState,
    name: &str,
    occupation: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let created_at = Utc::now();
    let pwd_hash = hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        AppError::PasswordError(e.to_string())
    })?;
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, occupation, email, pwd_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(name)
    .bind(occupation)
    .bind(email)
    .bind(pwd_hash)
    .bind(created_at)
    .bind(created_at)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Lost a race with a concurrent registration for the same email.
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            AppError::Conflict("Email already registered".into())
        } else {
            AppError::DatabaseError(e)
        }
    })?;
    log::info!("User created: id={}", user.id);
    Ok(user)
}

pub async fn list_expenses(
    state: &AppState,
    owner: AuthenticatedUser,
) -> Result<Vec<Expense>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses WHERE user_id = ? ORDER BY date DESC, created_at DESC, id DESC",
    )
    .bind(owner.id)
    .fetch_all(&pool)
    .await?;
    Ok(expenses)
}

pub async fn create_expense(
    state: &AppState,
    owner: AuthenticatedUser,
    expense: NewExpense,
) -> Result<Expense, sqlx::Error> {
    let created_at = Utc::now();
    let category = expense
        .category
        .unwrap_or_else(|| Category::Other.to_string());
    let pool = state.db_pool.clone();
    let expense = sqlx::query_as::<_, Expense>(
        "INSERT INTO expenses (user_id, title, amount, category, date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(owner.id)
    .bind(expense.title)
    .bind(expense.amount)
    .bind(category)
    .bind(expense.date)
    .bind(created_at)
    .bind(created_at)
    .fetch_one(&pool)
    .await?;
    log::info!("Expense {} created for user {}", expense.id, owner.id);
    Ok(expense)
}

/// Applies `changes` to the expense only if `owner` owns it. `None` covers both
/// a missing id and someone else's record.
pub async fn update_expense(
    state: &AppState,
    owner: AuthenticatedUser,
    id: i64,
    changes: ExpenseChanges,
) -> Result<Option<Expense>, sqlx::Error> {
    let pool = state.db_pool.clone();
    let mut query = String::from("UPDATE expenses SET updated_at = ?");
    if changes.title.is_some() {
        query.push_str(", title = ?");
    }
    if changes.amount.is_some() {
        query.push_str(", amount = ?");
    }
    if changes.category.is_some() {
        query.push_str(", category = ?");
    }
    if changes.date.is_some() {
        query.push_str(", date = ?");
    }
    query.push_str(" WHERE id = ? AND user_id = ? RETURNING *");

    let mut q = sqlx::query_as::<_, Expense>(&query).bind(Utc::now());
    if let Some(title) = changes.title {
        q = q.bind(title);
    }
    if let Some(amount) = changes.amount {
        q = q.bind(amount);
    }
    if let Some(category) = changes.category {
        q = q.bind(category);
    }
    if let Some(date) = changes.date {
        q = q.bind(date);
    }
    let expense = q.bind(id).bind(owner.id).fetch_optional(&pool).await?;

    if let Some(expense) = &expense {
        log::info!("Expense {} updated for user {}", expense.id, owner.id);
    }
    Ok(expense)
}

/// Returns whether a record owned by `owner` was removed.
pub async fn delete_expense(
    state: &AppState,
    owner: AuthenticatedUser,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(owner.id)
        .execute(&pool)
        .await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        log::info!("Expense {} deleted for user {}", id, owner.id);
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use chrono::NaiveDate;

    fn coffee(date: Option<NaiveDate>) -> NewExpense {
        NewExpense {
            title: "Coffee".into(),
            amount: 5.0,
            category: Some("Food".into()),
            date,
        }
    }

    async fn user(state: &AppState, email: &str) -> AuthenticatedUser {
        let user = create_user(state, "Ann", "", email, "pw123").await.unwrap();
        AuthenticatedUser { id: user.id }
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict_at_store_level() {
        let state = test_state().await;
        create_user(&state, "Ann", "", "ann@x.com", "pw123").await.unwrap();
        let second = create_user(&state, "Ann 2", "", "ann@x.com", "pw456").await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[actix_web::test]
    async fn missing_category_defaults_to_other() {
        let state = test_state().await;
        let owner = user(&state, "ann@x.com").await;
        let mut body = coffee(None);
        body.category = None;
        let created = create_expense(&state, owner, body).await.unwrap();
        assert_eq!(created.category, "Other");
        assert_eq!(created.date, None);
        assert_eq!(created.user_id, owner.id);
    }

    #[actix_web::test]
    async fn unrecognized_category_round_trips() {
        let state = test_state().await;
        let owner = user(&state, "ann@x.com").await;
        let mut body = coffee(None);
        body.category = Some("Crypto".into());
        create_expense(&state, owner, body).await.unwrap();
        let listed = list_expenses(&state, owner).await.unwrap();
        assert_eq!(listed[0].category, "Crypto");
    }

    #[actix_web::test]
    async fn list_orders_by_date_then_newest_first() {
        let state = test_state().await;
        let owner = user(&state, "ann@x.com").await;
        let jan = NaiveDate::from_ymd_opt(2024, 1, 5);
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1);

        let first_jan = create_expense(&state, owner, coffee(jan)).await.unwrap();
        let feb_entry = create_expense(&state, owner, coffee(feb)).await.unwrap();
        let undated = create_expense(&state, owner, coffee(None)).await.unwrap();
        let second_jan = create_expense(&state, owner, coffee(jan)).await.unwrap();

        let ids: Vec<i64> = list_expenses(&state, owner)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![feb_entry.id, second_jan.id, first_jan.id, undated.id]);
    }

    #[actix_web::test]
    async fn other_users_records_are_invisible() {
        let state = test_state().await;
        let ann = user(&state, "ann@x.com").await;
        let bob = user(&state, "bob@x.com").await;
        let expense = create_expense(&state, ann, coffee(None)).await.unwrap();

        assert!(list_expenses(&state, bob).await.unwrap().is_empty());
        let changes = ExpenseChanges {
            amount: Some(1.0),
            ..Default::default()
        };
        assert_eq!(update_expense(&state, bob, expense.id, changes).await.unwrap(), None);
        assert!(!delete_expense(&state, bob, expense.id).await.unwrap());
        assert_eq!(list_expenses(&state, ann).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn update_applies_only_given_fields() {
        let state = test_state().await;
        let owner = user(&state, "ann@x.com").await;
        let expense = create_expense(&state, owner, coffee(NaiveDate::from_ymd_opt(2024, 1, 5)))
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(7.0),
            date: Some(None),
            ..Default::default()
        };
        let updated = update_expense(&state, owner, expense.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.amount, 7.0);
        assert_eq!(updated.title, "Coffee");
        assert_eq!(updated.category, "Food");
        assert_eq!(updated.date, None);
        assert_eq!(updated.created_at, expense.created_at);
        assert!(updated.updated_at >= expense.updated_at);
    }
}
