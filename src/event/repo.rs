use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::delegates::repo::Delegate;
use crate::error::ApiError;

/// Event-day profile for the Mumbai MUN extension: a snapshot of the
/// delegate at registration time plus assignment and meal flags. Linked to
/// the main directory only by sharing the delegate's id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MMDelegate {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub contact: String,
    pub dateofbirth: String,
    pub gender: String,
    pub country: String,
    pub committee: String,
    pub d1_bf: bool,
    pub d1_lunch: bool,
    pub d1_hitea: bool,
    pub d2_bf: bool,
    pub d2_lunch: bool,
    pub d2_hitea: bool,
    pub d3_bf: bool,
    pub d3_lunch: bool,
    pub d3_hitea: bool,
}

impl MMDelegate {
    /// Snapshot a delegate into the event store. Day-one breakfast starts
    /// taken, every other meal untaken.
    pub fn from_delegate(delegate: &Delegate, country: String, committee: String) -> Self {
        Self {
            id: delegate.id.clone(),
            firstname: delegate.firstname.clone(),
            lastname: delegate.lastname.clone(),
            email: delegate.email.clone(),
            contact: delegate.contact.clone(),
            dateofbirth: delegate.dateofbirth.clone(),
            gender: delegate.gender.clone(),
            country,
            committee,
            d1_bf: true,
            d1_lunch: false,
            d1_hitea: false,
            d2_bf: false,
            d2_lunch: false,
            d2_hitea: false,
            d3_bf: false,
            d3_lunch: false,
            d3_hitea: false,
        }
    }

    pub async fn create(db: &SqlitePool, mm: &MMDelegate) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO mm_delegates
                (id, firstname, lastname, email, contact, dateofbirth, gender,
                 country, committee,
                 d1_bf, d1_lunch, d1_hitea,
                 d2_bf, d2_lunch, d2_hitea,
                 d3_bf, d3_lunch, d3_hitea)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mm.id)
        .bind(&mm.firstname)
        .bind(&mm.lastname)
        .bind(&mm.email)
        .bind(&mm.contact)
        .bind(&mm.dateofbirth)
        .bind(&mm.gender)
        .bind(&mm.country)
        .bind(&mm.committee)
        .bind(mm.d1_bf)
        .bind(mm.d1_lunch)
        .bind(mm.d1_hitea)
        .bind(mm.d2_bf)
        .bind(mm.d2_lunch)
        .bind(mm.d2_hitea)
        .bind(mm.d3_bf)
        .bind(mm.d3_lunch)
        .bind(mm.d3_hitea)
        .execute(db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(ApiError::Conflict(
                "Delegate already registered for the event".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<MMDelegate>, ApiError> {
        let mm = sqlx::query_as::<_, MMDelegate>("SELECT * FROM mm_delegates WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(mm)
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<MMDelegate>, ApiError> {
        let mms = sqlx::query_as::<_, MMDelegate>("SELECT * FROM mm_delegates ORDER BY id")
            .fetch_all(db)
            .await?;
        Ok(mms)
    }

    pub async fn update(db: &SqlitePool, id: &str, mm: &MMDelegate) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE mm_delegates
            SET firstname = ?, lastname = ?, email = ?, contact = ?,
                dateofbirth = ?, gender = ?, country = ?, committee = ?,
                d1_bf = ?, d1_lunch = ?, d1_hitea = ?,
                d2_bf = ?, d2_lunch = ?, d2_hitea = ?,
                d3_bf = ?, d3_lunch = ?, d3_hitea = ?
            WHERE id = ?
            "#,
        )
        .bind(&mm.firstname)
        .bind(&mm.lastname)
        .bind(&mm.email)
        .bind(&mm.contact)
        .bind(&mm.dateofbirth)
        .bind(&mm.gender)
        .bind(&mm.country)
        .bind(&mm.committee)
        .bind(mm.d1_bf)
        .bind(mm.d1_lunch)
        .bind(mm.d1_hitea)
        .bind(mm.d2_bf)
        .bind(mm.d2_lunch)
        .bind(mm.d2_hitea)
        .bind(mm.d3_bf)
        .bind(mm.d3_lunch)
        .bind(mm.d3_hitea)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM mm_delegates WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
