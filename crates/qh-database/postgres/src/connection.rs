use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::{Pool, RunError};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, PoolError};

/// Shared async connection pool type
pub type DbPool = Pool<AsyncPgConnection>;

/// Pool checkout error type
pub type CheckoutError = RunError;

const MAX_POOL_SIZE: u32 = 20;

/// Establish an async database connection pool
pub async fn establish_pool(database_url: &str) -> Result<DbPool, PoolError> {
  let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
  Pool::builder().max_size(MAX_POOL_SIZE).build(manager).await
}
