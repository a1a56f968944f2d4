use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, ShopCode, ShopDirectory};

pub struct PostgresShopDirectory {
  pool: PgPool,
}

impl PostgresShopDirectory {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ShopDirectory for PostgresShopDirectory {
  async fn code_of(&self, shop_id: Uuid) -> Result<ShopCode, BillingError> {
    let code: Option<String> = sqlx::query_scalar("SELECT shop_code FROM shops WHERE id = $1")
      .bind(shop_id)
      .fetch_optional(&self.pool)
      .await?;

    // A blank code is as unusable for numbering as a missing shop
    match code {
      Some(code) if !code.trim().is_empty() => Ok(ShopCode::new(code)?),
      _ => Err(BillingError::ShopNotFound(shop_id)),
    }
  }
}
