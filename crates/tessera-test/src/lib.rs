//! # Tessera Test
//!
//! In-memory testing for Tessera dispatchers: requests go through the full
//! dispatch pipeline without binding a port.
//!
//! ```ignore
//! use tessera_test::TestClient;
//!
//! #[tokio::test]
//! async fn owner_can_edit() {
//!     let client = TestClient::new(app());
//!
//!     client
//!         .put("/docs/1")
//!         .basic_auth("ann", "secret")
//!         .json(&serde_json::json!({"title": "Plan"}))
//!         .send()
//!         .await
//!         .assert_status(http::StatusCode::NO_CONTENT);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
