/* ===============================================================================
HomeKitchen ordering bot.
Database for sessions. 16 Oct 2026.
----------------------------------------------------------------------------
Licensed under the terms of the GPL version 3.
http://www.gnu.org/licenses/gpl-3.0.html
Copyright (c) 2020-2026 by Artem Khomenko _mag12@yahoo.com.
=============================================================================== */

use once_cell::sync::{OnceCell};
use deadpool_postgres::{Pool, Client, };
use futures::future::BoxFuture;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::types::ToSql;

use crate::environment as env;
use crate::session::SessionStore;

// Pool of db clients
pub type PoolAlias = Pool;
pub static DB: OnceCell<PoolAlias> = OnceCell::new();

pub type Params<'a> = &'a[&'a(dyn ToSql + Sync)];

// ============================================================================
// [Sessions table]
// ============================================================================

// Session values in the table, one row per user and key
pub struct PgStore;

impl SessionStore for PgStore {
   fn get<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<Option<String>, String>> {
      Box::pin(session_value(user_id, key))
   }

   fn set<'a>(&'a self, user_id: i64, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), String>> {
      Box::pin(session_set(user_id, key, value))
   }

   fn remove<'a>(&'a self, user_id: i64, key: &'a str) -> BoxFuture<'a, Result<(), String>> {
      Box::pin(session_remove(user_id, key))
   }
}

pub async fn session_value(user_id: i64, key: &str) -> Result<Option<String>, String> {
   // DB client from the pool
   let client = db_client().await?;

   // Prepare query
   let statement = client
   .prepare("SELECT value FROM sessions WHERE user_id = $1::BIGINT AND key = $2::VARCHAR")
   .await
   .map_err(|err| format!("session_value prepare: {}", err))?;

   // Run query
   let rows = client
   .query(&statement, &[&user_id, &key])
   .await
   .map_err(|err| format!("session_value query: {}", err))?;

   match rows.first() {
      Some(row) => row.try_get(0).map_err(|err| format!("session_value get: {}", err)),
      None => Ok(None),
   }
}

pub async fn session_set(user_id: i64, key: &str, value: &str) -> Result<(), String> {
   let text = "INSERT INTO sessions (user_id, key, value) VALUES ($1::BIGINT, $2::VARCHAR, $3::VARCHAR)
      ON CONFLICT (user_id, key) DO UPDATE SET value = EXCLUDED.value";
   execute_one(text, &[&user_id, &key, &value]).await
}

// Missing value is not an error
pub async fn session_remove(user_id: i64, key: &str) -> Result<(), String> {
   let text = "DELETE FROM sessions WHERE user_id = $1::BIGINT AND key = $2::VARCHAR";
   execute_prepared(text, &[&user_id, &key]).await?;
   Ok(())
}

// ============================================================================
// [Init]
// ============================================================================

pub async fn is_tables_exist() -> bool {
   // DB client from the pool
   let client = match db_client().await {
      Ok(client) => client,
      Err(_) => return false,
   };

   // Check that the table exists
   let rows = client
   .query("SELECT table_name FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME='sessions'", &[]).await;

   // Return result
   match rows {
      Ok(data) => !data.is_empty(),
      _ => false,
   }
}

pub async fn create_tables() -> bool {
   let client = match db_client().await {
      Ok(client) => client,
      Err(_) => return false,
   };

   let query = client
   .batch_execute("CREATE TABLE sessions (
         PRIMARY KEY (user_id, key),
         user_id        BIGINT         NOT NULL,
         key            VARCHAR(32)    NOT NULL,
         value          VARCHAR        NOT NULL);
   ")
   .await;

   match query {
      Ok(_) => true,
      Err(e) => {
         env::log(&format!("Error create_tables: {}", e)).await;
         false
       }
   }
}

// Convert bool to text
pub fn is_success(flag : bool) -> &'static str {
   if flag {
      "success"
  } else {
      "error"
  }
}

// Client from the pool
async fn db_client() -> Result<Client, String> {
   let pool = DB.get().ok_or_else(|| String::from("No db pool"))?;
   match pool.get().await {
      Ok(client) => Ok(client),
      Err(e) => {
         let error = format!("No db client: {}", e);
         env::log(&error).await;
         Err(error)
      }
   }
}

async fn execute_one(sql_text: &str, params: Params<'_>) -> Result<(), String> {
   // Only one record has to be affected
   let affected = execute_prepared(sql_text, params).await?;
   if affected == 1 { Ok(()) }
   else { Err(format!("execute_one {}: affected {} records instead one (params: {:?})", sql_text, affected, params)) }
}

async fn execute_prepared(sql_text: &str, params: Params<'_>) -> Result<u64, String> {
   // DB client from the pool
   let client = db_client().await?;

   // Prepare query
   let statement = client
   .prepare(sql_text)
   .await
   .map_err(|err| format!("execute_prepared {} prepare: {}", sql_text, err))?;

   // Run query
   let query = client.execute(&statement, params)
   .await
   .map_err(|err| format!("execute_prepared {} execute: {}", sql_text, err))?;

   Ok(query)
}

// Connect to the database and remember the pool
pub fn connect(database_url: &str) -> Result<(), String> {
   let connector = native_tls::TlsConnector::builder()
   .danger_accept_invalid_certs(true)
   .build()
   .map_err(|err| format!("connect tls: {}", err))?;
   let connector = MakeTlsConnector::new(connector);

   let pg_config = database_url
   .parse::<tokio_postgres::Config>()
   .map_err(|err| format!("connect DATABASE_URL: {}", err))?;
   let mgr_config = deadpool_postgres::ManagerConfig {
      recycling_method: deadpool_postgres::RecyclingMethod::Fast
   };
   let mgr = deadpool_postgres::Manager::from_config(pg_config, connector, mgr_config);
   let pool = Pool::builder(mgr)
   .max_size(16)
   .build()
   .map_err(|err| format!("connect pool: {}", err))?;

   DB.set(pool).map_err(|_| String::from("connect: pool already set"))
}
