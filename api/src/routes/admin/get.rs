use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use db::models::package::{
    Column as PackageColumn, Entity as PackageEntity, PackageStatus,
};
use db::models::user::{Column as UserColumn, Entity as UserEntity, Model as UserModel, Role};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use util::state::AppState;

use crate::response::ApiResponse;
use crate::routes::common::{DriverResponse, PackageResponse};

/// GET /api/admin/drivers
///
/// Lists all driver accounts, newest first.
pub async fn list_drivers(State(app_state): State<AppState>) -> impl IntoResponse {
    match UserEntity::find()
        .filter(UserColumn::Role.eq(Role::Driver))
        .order_by_desc(UserColumn::Id)
        .all(app_state.db())
        .await
    {
        Ok(drivers) => {
            let out: Vec<DriverResponse> = drivers.into_iter().map(DriverResponse::from).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(out, "Drivers retrieved successfully")),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error listing drivers");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<DriverResponse>>::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct DriverStatsResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub delivered: u64,
    pub failed: u64,
    pub closed: u64,
    /// Delivered ÷ closed, in `0.0..=1.0`; `0.0` when nothing was closed yet.
    pub effectiveness: f64,
}

async fn stats_for(db: &DatabaseConnection, driver: UserModel) -> Result<DriverStatsResponse, DbErr> {
    let delivered = PackageEntity::find()
        .filter(PackageColumn::DriverId.eq(driver.id))
        .filter(PackageColumn::Status.eq(PackageStatus::Delivered))
        .count(db)
        .await?;
    let failed = PackageEntity::find()
        .filter(PackageColumn::DriverId.eq(driver.id))
        .filter(PackageColumn::Status.eq(PackageStatus::NotDelivered))
        .count(db)
        .await?;
    let closed = delivered + failed;
    let effectiveness = if closed > 0 {
        delivered as f64 / closed as f64
    } else {
        0.0
    };

    Ok(DriverStatsResponse {
        id: driver.id,
        username: driver.username,
        full_name: driver.full_name,
        delivered,
        failed,
        closed,
        effectiveness,
    })
}

/// GET /api/admin/drivers_stats
///
/// Per-driver close counts and effectiveness ratio, newest driver first.
pub async fn drivers_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    let db = app_state.db();
    let drivers = match UserEntity::find()
        .filter(UserColumn::Role.eq(Role::Driver))
        .order_by_desc(UserColumn::Id)
        .all(db)
        .await
    {
        Ok(drivers) => drivers,
        Err(e) => {
            tracing::error!(error = %e, "DB error loading drivers for stats");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<DriverStatsResponse>>::error(
                    "Database error",
                )),
            );
        }
    };

    let mut out = Vec::with_capacity(drivers.len());
    for driver in drivers {
        match stats_for(db, driver).await {
            Ok(stats) => out.push(stats),
            Err(e) => {
                tracing::error!(error = %e, "DB error computing driver stats");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<Vec<DriverStatsResponse>>::error(
                        "Database error",
                    )),
                );
            }
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            out,
            "Driver stats retrieved successfully",
        )),
    )
}

#[derive(Debug, Deserialize)]
pub struct PackageFilter {
    pub status: Option<String>,
}

/// GET /api/admin/drivers/{driver_id}/packages
///
/// Packages assigned to one driver, newest-updated first. The optional
/// `status` query parameter filters by lifecycle state (`ASSIGNED`,
/// `DELIVERED`, `NOT_DELIVERED`; case-insensitive).
pub async fn driver_packages(
    State(app_state): State<AppState>,
    Path(driver_id): Path<i64>,
    Query(filter): Query<PackageFilter>,
) -> impl IntoResponse {
    let db = app_state.db();

    match UserEntity::find_by_id(driver_id).one(db).await {
        Ok(Some(user)) if user.role == Role::Driver => {}
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Driver not found")),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error loading driver");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Database error")),
            );
        }
    }

    let mut query = PackageEntity::find().filter(PackageColumn::DriverId.eq(driver_id));
    if let Some(status) = &filter.status {
        match PackageStatus::from_str(status) {
            Ok(status) => query = query.filter(PackageColumn::Status.eq(status)),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<Vec<PackageResponse>>::error("Invalid status")),
                );
            }
        }
    }

    let packages = match query
        .order_by_desc(PackageColumn::UpdatedAt)
        .all(db)
        .await
    {
        Ok(packages) => packages,
        Err(e) => {
            tracing::error!(error = %e, "DB error listing driver packages");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Database error")),
            );
        }
    };

    match PackageResponse::load_many(db, packages).await {
        Ok(out) => (
            StatusCode::OK,
            Json(ApiResponse::success(out, "Packages retrieved successfully")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "DB error loading proof images");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<PackageResponse>>::error("Database error")),
            )
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct MapDriver {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub lat: f64,
    pub lng: f64,
    pub at: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct MapPackage {
    pub id: i64,
    pub code: String,
    pub status: String,
    pub recipient_name: String,
    pub address: String,
    pub driver_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub at: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct MapData {
    pub drivers: Vec<MapDriver>,
    pub packages: Vec<MapPackage>,
}

/// GET /api/admin/map_data
///
/// Initial snapshot for the admin live map: drivers with a known last
/// position, plus closed packages that captured coordinates. Live updates
/// after this snapshot arrive over the `/events` SSE stream.
pub async fn map_data(State(app_state): State<AppState>) -> impl IntoResponse {
    let db = app_state.db();

    let drivers = match UserEntity::find()
        .filter(UserColumn::Role.eq(Role::Driver))
        .order_by_desc(UserColumn::Id)
        .all(db)
        .await
    {
        Ok(drivers) => drivers,
        Err(e) => {
            tracing::error!(error = %e, "DB error loading drivers for map");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<MapData>::error("Database error")),
            );
        }
    };

    let drivers_out: Vec<MapDriver> = drivers
        .into_iter()
        .filter_map(|d| match (d.last_lat, d.last_lng) {
            (Some(lat), Some(lng)) => Some(MapDriver {
                id: d.id,
                full_name: d.full_name,
                username: d.username,
                lat,
                lng,
                at: d.last_location_at.map(|t| t.to_rfc3339()),
            }),
            _ => None,
        })
        .collect();

    let packages = match PackageEntity::find()
        .filter(PackageColumn::Lat.is_not_null())
        .filter(PackageColumn::Lng.is_not_null())
        .order_by_desc(PackageColumn::UpdatedAt)
        .all(db)
        .await
    {
        Ok(packages) => packages,
        Err(e) => {
            tracing::error!(error = %e, "DB error loading packages for map");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<MapData>::error("Database error")),
            );
        }
    };

    let packages_out: Vec<MapPackage> = packages
        .into_iter()
        .filter_map(|p| match (p.lat, p.lng) {
            (Some(lat), Some(lng)) => Some(MapPackage {
                id: p.id,
                code: p.code,
                status: p.status.to_string(),
                recipient_name: p.recipient_name,
                address: p.address,
                driver_id: p.driver_id,
                lat,
                lng,
                at: p.location_at.map(|t| t.to_rfc3339()),
            }),
            _ => None,
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            MapData {
                drivers: drivers_out,
                packages: packages_out,
            },
            "Map data retrieved successfully",
        )),
    )
}
