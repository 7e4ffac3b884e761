//! Test helpers: build AppState and router over an in-memory store and a
//! temporary upload directory. No database or network is needed.

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use imgdrop_api::setup::routes;
use imgdrop_api::state::AppState;
use imgdrop_core::{ImageMime, ImageRecord, NewImageRecord};
use imgdrop_db::{ImageStore, InMemoryImageStore};
use imgdrop_storage::LocalStorage;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://img.example.test";

/// Test application: server plus the resources behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryImageStore>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Put `bytes` in the upload directory without a metadata record.
    pub fn write_file(&self, filename: &str, bytes: &[u8]) {
        std::fs::write(self.dir.path().join(filename), bytes).unwrap();
    }

    /// Store a file and its record, as the ingestion pipeline would.
    pub async fn add_image(
        &self,
        filename: &str,
        original_filename: &str,
        mime_type: ImageMime,
        bytes: &[u8],
    ) -> ImageRecord {
        self.write_file(filename, bytes);
        self.store
            .insert(NewImageRecord {
                filename: filename.to_string(),
                original_filename: original_filename.to_string(),
                file_size: bytes.len() as i64,
                mime_type,
                telegram_user_id: "4242".to_string(),
                telegram_username: Some("tester".to_string()),
                upload_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            })
            .await
            .unwrap()
    }
}

pub async fn setup_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
    let store = Arc::new(InMemoryImageStore::new());

    let state = Arc::new(AppState {
        store: store.clone(),
        storage,
        base_url: BASE_URL.to_string(),
        max_upload_size_bytes: 20 * 1024 * 1024,
        polling_enabled: false,
    });

    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp { server, store, dir }
}
