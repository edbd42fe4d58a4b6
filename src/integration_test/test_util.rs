use crate::app_env::test::TEST_DB_URL;
use crate::{SharedData, build_router, db, persistence};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use dotenv::dotenv;
use lazy_static::lazy_static;
use rand::{Rng, thread_rng};
use serde::Serialize;
use sqlx::{Connection, PgConnection};
use std::env;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tower::ServiceExt;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

struct TestDatabase {
    base_url: String,
    db_name: String,
}

impl TestDatabase {
    async fn create(base_url: &str) -> Result<Self, sqlx::Error> {
        let schema_id: u32 = thread_rng().gen_range(10_000..99_999);
        let db_name = format!("test_db_{}", schema_id);
        let mut conn = PgConnection::connect(base_url).await?;

        sqlx::query(format!("CREATE DATABASE {}", db_name).as_str())
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        Ok(Self {
            base_url: String::from(base_url),
            db_name,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.db_name)
    }

    async fn remove(self) {
        let conn = PgConnection::connect(self.base_url.as_str()).await;
        let mut conn = match conn {
            Ok(cxn) => cxn,
            Err(conn_err) => {
                println!(
                    "Failed to reconnect to database to drop test database {}, please remove it manually. Error: {}",
                    self.db_name, conn_err
                );
                return;
            }
        };

        let drop_result = sqlx::query(format!("DROP DATABASE {}", self.db_name).as_str())
            .execute(&mut conn)
            .await;
        if let Err(db_err) = drop_result {
            println!(
                "Failed to drop test database {}, please remove it manually. Error: {}",
                self.db_name, db_err
            );
        }
    }
}

/// Creates a fresh, migrated database for a test and hands the test a router backed by it.
/// The database is dropped once the test finishes.
///
/// Expects that the TEST_DB_URL environment variable is populated
pub fn prepare_db_and_test<F, R>(test_fn: F)
where
    F: FnOnce(Router) -> R,
    R: Future<Output = ()>,
{
    if dotenv().is_err() {
        println!("Test is running without .env file.");
    }

    TOKIO_RT.block_on(async move {
        let pg_connection_base_url = env::var(TEST_DB_URL).expect(
            "You must provide the TEST_DB_URL environment variable as the base postgres connection string",
        );
        let test_db = match TestDatabase::create(&pg_connection_base_url).await {
            Ok(tdb) => tdb,
            Err(db_err) => panic!("Failed to start test database: {}", db_err),
        };

        let pool = db::connect_sqlx(test_db.url().as_str())
            .await
            .expect("Could not connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("Could not migrate test database");
        let ext_cxn = persistence::ExternalConnectivity::new(pool.clone());

        test_fn(build_router(Arc::new(SharedData { ext_cxn }))).await;

        pool.close().await;
        test_db.remove().await;
    });
}

/// Sends a request with a JSON body through the router
pub async fn send_json<T: Serialize>(
    router: &Router,
    method: Method,
    uri: &str,
    body: &T,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(body).expect("Request body could not be serialized"),
        ))
        .expect("Request could not be built");

    router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {})
}

/// Sends a request without a body through the router
pub async fn send_empty(router: &Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("Request could not be built");

    router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {})
}

/// Creates a user through the API and returns its ID
pub async fn create_user(router: &Router, first_name: &str) -> i32 {
    let response = send_json(
        router,
        Method::POST,
        "/users",
        &crate::dto::NewUser {
            first_name: first_name.to_owned(),
            last_name: "Tester".to_owned(),
        },
    )
    .await;
    let inserted: crate::dto::InsertedUser =
        crate::api::test_util::deserialize_body(response.into_body()).await;

    inserted.id
}
