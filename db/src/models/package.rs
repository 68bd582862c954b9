use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Prefix for generated package codes, e.g. `PKG0001`.
const CODE_PREFIX: &str = "PKG";

/// Represents a delivery package in the `packages` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique, human-readable package code (e.g. `PKG0001`).
    pub code: String,
    pub recipient_name: String,
    pub address: String,
    pub phone: String,
    /// Driver this package is assigned to.
    pub driver_id: i64,
    pub status: PackageStatus,
    /// Proof-of-delivery notes written by the driver at close time.
    pub pod_notes: String,
    /// Reason selected when closing as NOT_DELIVERED.
    pub non_delivery_reason: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Coordinates captured at close time, if the device shared them.
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state: a package starts ASSIGNED and is closed exactly once,
/// as either DELIVERED or NOT_DELIVERED.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "package_status")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PackageStatus {
    #[sea_orm(string_value = "ASSIGNED")]
    Assigned,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "NOT_DELIVERED")]
    NotDelivered,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The assigned driver.
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DriverId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Proof images attached when the package was closed.
    #[sea_orm(has_many = "super::proof_image::Entity")]
    ProofImage,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::proof_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProofImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this package has already been closed (either outcome).
    pub fn is_closed(&self) -> bool {
        matches!(
            self.status,
            PackageStatus::Delivered | PackageStatus::NotDelivered
        )
    }

    /// Generates the next sequential package code (`PKG0001`, `PKG0002`, ...).
    ///
    /// Falls back to the first code when the table is empty or the highest
    /// code does not carry the expected prefix.
    pub async fn next_code(db: &DatabaseConnection) -> Result<String, DbErr> {
        let max = Entity::find()
            .order_by_desc(Column::Code)
            .one(db)
            .await?
            .map(|p| p.code);

        let next = match max {
            Some(code) if code.starts_with(CODE_PREFIX) => {
                code[CODE_PREFIX.len()..].parse::<u32>().unwrap_or(0) + 1
            }
            _ => 1,
        };
        Ok(format!("{CODE_PREFIX}{next:04}"))
    }

    /// Creates a new package in the ASSIGNED state for the given driver.
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        recipient_name: &str,
        address: &str,
        phone: &str,
        driver_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let package = ActiveModel {
            code: Set(code.to_owned()),
            recipient_name: Set(recipient_name.to_owned()),
            address: Set(address.to_owned()),
            phone: Set(phone.to_owned()),
            driver_id: Set(driver_id),
            status: Set(PackageStatus::Assigned),
            pod_notes: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        package.insert(db).await
    }

    /// Looks a package up by its unique code.
    pub async fn find_by_code(db: &DatabaseConnection, code: &str) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Code.eq(code)).one(db).await
    }
}
