//! Response shapes and helpers shared across route groups.

use db::models::{package, proof_image};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use validator::ValidationErrors;

/// Flattens validator errors into a single `;`-separated message string.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// A driver account as exposed to admins.
#[derive(Debug, Serialize, Default)]
pub struct DriverResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

impl From<db::models::user::Model> for DriverResponse {
    fn from(user: db::models::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
        }
    }
}

/// A proof image reference with a servable URL.
#[derive(Debug, Serialize, Default)]
pub struct ProofResponse {
    pub id: i64,
    pub proof_type: String,
    pub url: String,
}

impl From<proof_image::Model> for ProofResponse {
    fn from(proof: proof_image::Model) -> Self {
        Self {
            id: proof.id,
            proof_type: proof.proof_type.to_string(),
            url: format!("/uploads/{}", proof.filename),
        }
    }
}

/// A package with its attached proof images, as returned by both the admin
/// and driver route groups.
#[derive(Debug, Serialize, Default)]
pub struct PackageResponse {
    pub id: i64,
    pub code: String,
    pub recipient_name: String,
    pub address: String,
    pub phone: String,
    pub driver_id: i64,
    pub status: String,
    pub pod_notes: String,
    pub non_delivery_reason: Option<String>,
    pub closed_at: Option<String>,
    pub proofs: Vec<ProofResponse>,
}

impl PackageResponse {
    pub fn from_package(pkg: package::Model, proofs: Vec<proof_image::Model>) -> Self {
        Self {
            id: pkg.id,
            code: pkg.code,
            recipient_name: pkg.recipient_name,
            address: pkg.address,
            phone: pkg.phone,
            driver_id: pkg.driver_id,
            status: pkg.status.to_string(),
            pod_notes: pkg.pod_notes,
            non_delivery_reason: pkg.non_delivery_reason,
            closed_at: pkg.closed_at.map(|t| t.to_rfc3339()),
            proofs: proofs.into_iter().map(ProofResponse::from).collect(),
        }
    }

    /// Loads the proof images for `pkg` and builds the response.
    pub async fn load(db: &DatabaseConnection, pkg: package::Model) -> Result<Self, DbErr> {
        let proofs = proof_image::Entity::find()
            .filter(proof_image::Column::PackageId.eq(pkg.id))
            .order_by_asc(proof_image::Column::Id)
            .all(db)
            .await?;
        Ok(Self::from_package(pkg, proofs))
    }

    /// Builds responses for a list of packages, preserving order.
    pub async fn load_many(
        db: &DatabaseConnection,
        packages: Vec<package::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut out = Vec::with_capacity(packages.len());
        for pkg in packages {
            out.push(Self::load(db, pkg).await?);
        }
        Ok(out)
    }
}
