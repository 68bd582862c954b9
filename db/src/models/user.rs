use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents an account in the `users` table: either an admin or a driver.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Display name shown on the admin map and driver lists.
    pub full_name: String,
    /// Securely hashed password string.
    pub password_hash: String,
    /// Account role: admin or driver.
    pub role: Role,
    /// Last known driver position, if any was ever reported.
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_location_at: Option<DateTime<Utc>>,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Account role, backed by a string column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "driver")]
    Driver,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Packages assigned to this user (drivers only).
    #[sea_orm(has_many = "super::package::Entity")]
    Package,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Hashes a plaintext password with Argon2 and a fresh random salt.
    pub fn hash_password(password: &str) -> Result<String, DbErr> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DbErr::Custom(format!("password hashing failed: {e}")))?
            .to_string())
    }

    /// Verifies a plaintext password against this user's stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Creates a new user with the given role.
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let user = ActiveModel {
            username: Set(username.to_owned()),
            full_name: Set(full_name.to_owned()),
            password_hash: Set(Self::hash_password(password)?),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        user.insert(db).await
    }

    /// Looks a user up by login name.
    pub async fn find_by_username(
        db: &DatabaseConnection,
        username: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::Username.eq(username))
            .one(db)
            .await
    }

    /// Stores a driver's last known position and returns the updated row.
    pub async fn update_last_location(
        self,
        db: &DatabaseConnection,
        lat: f64,
        lng: f64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let mut active: ActiveModel = self.into();
        active.last_lat = Set(Some(lat));
        active.last_lng = Set(Some(lng));
        active.last_location_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn create_hashes_the_password_and_verifies_it() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "dispatch1", "Dispatch One", "s3cret", Role::Driver)
            .await
            .unwrap();

        assert_ne!(user.password_hash, "s3cret");
        assert!(user.verify_password("s3cret"));
        assert!(!user.verify_password("wrong"));
    }

    #[tokio::test]
    async fn find_by_username_matches_exactly() {
        let db = setup_test_db().await;
        Model::create(&db, "ana", "Ana P", "pw1234", Role::Driver)
            .await
            .unwrap();

        assert!(Model::find_by_username(&db, "ana").await.unwrap().is_some());
        assert!(Model::find_by_username(&db, "anabel").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_last_location_sets_coordinates_and_timestamp() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "d1", "Driver One", "pw1234", Role::Driver)
            .await
            .unwrap();
        assert!(user.last_lat.is_none());

        let updated = user.update_last_location(&db, -12.05, -77.03).await.unwrap();
        assert_eq!(updated.last_lat, Some(-12.05));
        assert_eq!(updated.last_lng, Some(-77.03));
        assert!(updated.last_location_at.is_some());
    }
}
