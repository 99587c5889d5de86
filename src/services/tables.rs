use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{entities::table, errors::ServiceError};

pub const QR_TOKEN_LEN: usize = 32;

fn validate_seats(seats: i32) -> Result<(), ValidationError> {
    if seats == 2 || seats == 4 {
        Ok(())
    } else {
        let mut err = ValidationError::new("seats");
        err.message = Some("Tables seat either 2 or 4 guests".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateTableRequest {
    #[validate(range(min = 1, message = "Table number must be positive"))]
    pub table_number: i32,
    #[validate(custom = "validate_seats")]
    pub seats: i32,
    #[serde(default)]
    pub x_position: i32,
    #[serde(default)]
    pub y_position: i32,
}

/// Random alphanumeric token printed on a table's QR code.
pub fn generate_qr_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(QR_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct TableService {
    db: Arc<DatabaseConnection>,
}

impl TableService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All tables, by seats then number
    pub async fn list(&self) -> Result<Vec<table::Model>, ServiceError> {
        Ok(table::Entity::find()
            .order_by_asc(table::Column::Seats)
            .order_by_asc(table::Column::TableNumber)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request), fields(table_number = request.table_number))]
    pub async fn create(&self, request: CreateTableRequest) -> Result<table::Model, ServiceError> {
        request.validate()?;

        let taken = table::Entity::find()
            .filter(table::Column::TableNumber.eq(request.table_number))
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            warn!("Duplicate table number");
            return Err(ServiceError::Conflict(format!(
                "Table {} already exists",
                request.table_number
            )));
        }

        let created = table::ActiveModel {
            table_number: Set(request.table_number),
            seats: Set(request.seats),
            x_position: Set(request.x_position),
            y_position: Set(request.y_position),
            qr_token: Set(generate_qr_token()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create table");
            ServiceError::DatabaseError(e)
        })?;

        info!(table_id = created.id, seats = created.seats, "Table created");
        Ok(created)
    }

    /// Issues a fresh QR token, the only change a table accepts after creation.
    #[instrument(skip(self))]
    pub async fn regenerate_qr(&self, id: i32) -> Result<table::Model, ServiceError> {
        let current = table::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Table {} not found", id)))?;

        let mut active: table::ActiveModel = current.into();
        active.qr_token = Set(generate_qr_token());
        let updated = active.update(&*self.db).await?;
        info!(table_id = id, "Table QR token regenerated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_32_alphanumerics_and_differ() {
        let a = generate_qr_token();
        let b = generate_qr_token();
        assert_eq!(a.len(), QR_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn only_two_or_four_seats() {
        let mut request = CreateTableRequest {
            table_number: 7,
            seats: 3,
            x_position: 0,
            y_position: 0,
        };
        assert!(request.validate().is_err());
        request.seats = 4;
        assert!(request.validate().is_ok());
    }
}
