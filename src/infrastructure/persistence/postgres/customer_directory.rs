use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, CustomerCode, CustomerDirectory};

pub struct PostgresCustomerDirectory {
  pool: PgPool,
}

impl PostgresCustomerDirectory {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
  async fn code_of(&self, customer_id: Uuid) -> Result<CustomerCode, BillingError> {
    let code: Option<String> =
      sqlx::query_scalar("SELECT customer_code FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

    match code {
      Some(code) if !code.trim().is_empty() => Ok(CustomerCode::new(code)?),
      _ => Err(BillingError::CustomerNotFound(customer_id)),
    }
  }

  async fn exists(&self, customer_id: Uuid) -> Result<bool, BillingError> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = $1")
      .bind(customer_id)
      .fetch_optional(&self.pool)
      .await?;

    Ok(found.is_some())
  }
}
