use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A stored photo proving the outcome of a package close.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "proof_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub package_id: i64,
    pub proof_type: ProofType,
    /// Stored file name only; the upload root is configuration.
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which outcome the photo documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "proof_type")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ProofType {
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "NOT_DELIVERED")]
    NotDelivered,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id"
    )]
    Package,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Records a stored proof file for a package.
    ///
    /// Generic over the connection so a close can insert its proof rows and
    /// flip the package status inside one transaction.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        package_id: i64,
        proof_type: ProofType,
        filename: &str,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let proof = ActiveModel {
            package_id: Set(package_id),
            proof_type: Set(proof_type),
            filename: Set(filename.to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        proof.insert(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::package::Model as PackageModel;
    use crate::models::user::{Model as UserModel, Role};
    use crate::test_utils::setup_test_db;
    use sea_orm::TransactionTrait;

    async fn package(db: &sea_orm::DatabaseConnection) -> PackageModel {
        let driver = UserModel::create(db, "p1", "P One", "pw1234", Role::Driver)
            .await
            .unwrap();
        PackageModel::create(db, "PKG0001", "Alice", "1 Main St", "", driver.id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_records_a_proof_row() {
        let db = setup_test_db().await;
        let pkg = package(&db).await;

        let proof = Model::create(&db, pkg.id, ProofType::Delivered, "a.jpg")
            .await
            .unwrap();
        assert_eq!(proof.package_id, pkg.id);
        assert_eq!(proof.proof_type, ProofType::Delivered);
        assert_eq!(proof.filename, "a.jpg");
    }

    #[tokio::test]
    async fn rolled_back_transaction_leaves_no_proof_rows() {
        let db = setup_test_db().await;
        let pkg = package(&db).await;

        let txn = db.begin().await.unwrap();
        Model::create(&txn, pkg.id, ProofType::Delivered, "a.jpg")
            .await
            .unwrap();
        Model::create(&txn, pkg.id, ProofType::Delivered, "b.jpg")
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        let remaining = Entity::find().all(&db).await.unwrap();
        assert!(remaining.is_empty());
    }
}
