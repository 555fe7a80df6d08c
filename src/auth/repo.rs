use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::ApiError;

/// Admin credential. Admins have no delegate profile.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Admin {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// User credential. The email references a delegate row (cascading
/// update/delete), so every user corresponds to exactly one delegate.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub email: String,
    pub password: String,
}

impl Admin {
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<Admin>, ApiError> {
        let admin =
            sqlx::query_as::<_, Admin>("SELECT email, password FROM admins WHERE email = ?")
                .bind(email)
                .fetch_optional(db)
                .await?;
        Ok(admin)
    }
}

impl User {
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT email, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Insert a user credential. The email must already exist in delegates;
    /// a duplicate maps to `Conflict`.
    pub async fn create(db: &SqlitePool, email: &str, password_hash: &str) -> Result<(), ApiError> {
        let result = sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
            .bind(email)
            .bind(password_hash)
            .execute(db)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ApiError::Conflict("User already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn change_password(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET password = ? WHERE email = ?")
            .bind(password_hash)
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegates::repo::{new_delegate_id, Delegate};
    use crate::state::AppState;

    async fn seed_delegate(state: &AppState, email: &str) {
        let delegate = Delegate {
            id: new_delegate_id(),
            firstname: "Test".into(),
            lastname: "User".into(),
            email: email.into(),
            contact: String::new(),
            dateofbirth: String::new(),
            gender: String::new(),
            pastmuns: vec![],
            verified: false,
        };
        Delegate::create(&state.main_db, &delegate)
            .await
            .expect("seed delegate");
    }

    #[tokio::test]
    async fn user_create_requires_matching_delegate() {
        let state = AppState::fake().await;
        // No delegate row: the foreign key rejects the credential.
        let err = User::create(&state.main_db, "nobody@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn user_create_and_duplicate_conflict() {
        let state = AppState::fake().await;
        seed_delegate(&state, "u@example.com").await;
        User::create(&state.main_db, "u@example.com", "hash")
            .await
            .expect("create");
        let err = User::create(&state.main_db, "u@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn change_password_overwrites_hash() {
        let state = AppState::fake().await;
        seed_delegate(&state, "p@example.com").await;
        User::create(&state.main_db, "p@example.com", "old-hash")
            .await
            .expect("create");
        User::change_password(&state.main_db, "p@example.com", "new-hash")
            .await
            .expect("update");
        let user = User::find_by_email(&state.main_db, "p@example.com")
            .await
            .expect("query")
            .expect("found");
        assert_eq!(user.password, "new-hash");
    }
}
