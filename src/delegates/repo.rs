use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::delegates::codec;
use crate::error::ApiError;

/// A past-conference participation record, embedded in the delegate's
/// pastmuns column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunExperience {
    pub name: String,
    #[serde(default)]
    pub committee: String,
    #[serde(default)]
    pub delegation: String,
    pub year: i64,
    #[serde(default)]
    pub award: String,
}

/// A conference participant's profile, independent of login credentials.
/// `id` is 32 hex characters, assigned once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegate {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub contact: String,
    pub dateofbirth: String,
    pub gender: String,
    pub pastmuns: Vec<MunExperience>,
    pub verified: bool,
}

#[derive(Debug, FromRow)]
struct DelegateRow {
    id: String,
    firstname: String,
    lastname: String,
    email: String,
    contact: String,
    dateofbirth: String,
    gender: String,
    pastmuns: String,
    verified: bool,
}

impl TryFrom<DelegateRow> for Delegate {
    type Error = ApiError;

    fn try_from(row: DelegateRow) -> Result<Self, Self::Error> {
        let pastmuns = codec::decode(&row.pastmuns)?;
        Ok(Delegate {
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            contact: row.contact,
            dateofbirth: row.dateofbirth,
            gender: row.gender,
            pastmuns,
            verified: row.verified,
        })
    }
}

pub fn new_delegate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

const SELECT_COLUMNS: &str =
    "id, firstname, lastname, email, contact, dateofbirth, gender, pastmuns, verified";

impl Delegate {
    /// Insert a new delegate. The UNIQUE constraint on email makes this the
    /// atomic create-if-absent step; a duplicate maps to `Conflict`.
    pub async fn create(db: &SqlitePool, delegate: &Delegate) -> Result<(), ApiError> {
        let pastmuns = codec::encode(&delegate.pastmuns)?;
        let result = sqlx::query(
            r#"
            INSERT INTO delegates
                (id, firstname, lastname, email, contact, dateofbirth, gender, pastmuns, verified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&delegate.id)
        .bind(&delegate.firstname)
        .bind(&delegate.lastname)
        .bind(&delegate.email)
        .bind(&delegate.contact)
        .bind(&delegate.dateofbirth)
        .bind(&delegate.gender)
        .bind(&pastmuns)
        .bind(delegate.verified)
        .execute(db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ApiError::Conflict("Delegate already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<Delegate>, ApiError> {
        let row = sqlx::query_as::<_, DelegateRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM delegates WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        row.map(Delegate::try_from).transpose()
    }

    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<Delegate>, ApiError> {
        let row = sqlx::query_as::<_, DelegateRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM delegates WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        row.map(Delegate::try_from).transpose()
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<Delegate>, ApiError> {
        let rows = sqlx::query_as::<_, DelegateRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM delegates ORDER BY id"
        ))
        .fetch_all(db)
        .await?;
        rows.into_iter().map(Delegate::try_from).collect()
    }

    /// Write the full row back under the immutable id.
    pub async fn update(db: &SqlitePool, id: &str, delegate: &Delegate) -> Result<(), ApiError> {
        let pastmuns = codec::encode(&delegate.pastmuns)?;
        sqlx::query(
            r#"
            UPDATE delegates
            SET firstname = ?, lastname = ?, email = ?, contact = ?,
                dateofbirth = ?, gender = ?, pastmuns = ?, verified = ?
            WHERE id = ?
            "#,
        )
        .bind(&delegate.firstname)
        .bind(&delegate.lastname)
        .bind(&delegate.email)
        .bind(&delegate.contact)
        .bind(&delegate.dateofbirth)
        .bind(&delegate.gender)
        .bind(&pastmuns)
        .bind(delegate.verified)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Mark the delegate's email as verified. Monotonic: there is no path
    /// back to unverified.
    pub async fn mark_verified(db: &SqlitePool, email: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE delegates SET verified = 1 WHERE email = ?")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn sample(email: &str) -> Delegate {
        Delegate {
            id: new_delegate_id(),
            firstname: "Asha".into(),
            lastname: "Menon".into(),
            email: email.into(),
            contact: "9800000000".into(),
            dateofbirth: "2004-05-17".into(),
            gender: "F".into(),
            pastmuns: vec![MunExperience {
                name: "Harvard MUN".into(),
                committee: "UNHRC".into(),
                delegation: "France".into(),
                year: 2023,
                award: "Best Delegate".into(),
            }],
            verified: false,
        }
    }

    #[test]
    fn generated_ids_are_32_hex_chars() {
        let id = new_delegate_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn create_and_find_roundtrip() {
        let state = AppState::fake().await;
        let delegate = sample("asha@example.com");
        Delegate::create(&state.main_db, &delegate)
            .await
            .expect("create");

        let by_id = Delegate::find_by_id(&state.main_db, &delegate.id)
            .await
            .expect("query")
            .expect("found");
        assert_eq!(by_id.email, "asha@example.com");
        assert_eq!(by_id.pastmuns, delegate.pastmuns);
        assert!(!by_id.verified);

        let by_email = Delegate::find_by_email(&state.main_db, "asha@example.com")
            .await
            .expect("query")
            .expect("found");
        assert_eq!(by_email.id, delegate.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let state = AppState::fake().await;
        Delegate::create(&state.main_db, &sample("dup@example.com"))
            .await
            .expect("first create");
        let err = Delegate::create(&state.main_db, &sample("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let all = Delegate::list_all(&state.main_db).await.expect("list");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn mark_verified_sticks() {
        let state = AppState::fake().await;
        let delegate = sample("v@example.com");
        Delegate::create(&state.main_db, &delegate)
            .await
            .expect("create");
        Delegate::mark_verified(&state.main_db, "v@example.com")
            .await
            .expect("verify");
        let found = Delegate::find_by_email(&state.main_db, "v@example.com")
            .await
            .expect("query")
            .expect("found");
        assert!(found.verified);
    }
}
