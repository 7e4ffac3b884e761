#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use bytes::Bytes;
use imgdrop_core::{ImageRecord, NewImageRecord, PersistenceError};
use imgdrop_db::{ImageStore, InMemoryImageStore};
use futures::Stream;
use imgdrop_storage::{ByteStream, LocalStorage, StagedFile, Storage, StorageError, StorageResult};
use imgdrop_telegram::{
    BotApi, Chat, Document, FileDescriptor, FileStream, Message, PhotoSize, TransportError, Update,
    User,
};
use imgdrop_worker::{IngestionPipeline, UpdateDispatcher};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://img.example.test";
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
pub const CHAT_ID: i64 = 777;
pub const USER_ID: i64 = 4242;

#[derive(Default)]
struct FakeBotState {
    scripted: VecDeque<Result<Vec<Update>, TransportError>>,
    fetch_offsets: Vec<i64>,
    files: HashMap<String, FileDescriptor>,
    contents: HashMap<String, Vec<u8>>,
    descriptor_calls: Vec<String>,
    downloads: Vec<String>,
    replies: Vec<(i64, String)>,
    webhook_deleted: bool,
}

/// Recording stand-in for the Bot API.
///
/// `fetch_updates` pops scripted responses and returns an empty batch after a
/// short pause once the script is exhausted.
#[derive(Default)]
pub struct FakeBot {
    state: Mutex<FakeBotState>,
}

impl FakeBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, response: Result<Vec<Update>, TransportError>) {
        self.state.lock().unwrap().scripted.push_back(response);
    }

    /// Register a remote file reachable through `file_id`.
    pub fn add_file(&self, file_id: &str, path: &str, declared_size: Option<u64>, bytes: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            file_id.to_string(),
            FileDescriptor {
                path: path.to_string(),
                size: declared_size,
            },
        );
        state.contents.insert(path.to_string(), bytes);
    }

    pub fn fetch_offsets(&self) -> Vec<i64> {
        self.state.lock().unwrap().fetch_offsets.clone()
    }

    pub fn descriptor_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().descriptor_calls.clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn replies(&self) -> Vec<(i64, String)> {
        self.state.lock().unwrap().replies.clone()
    }

    pub fn last_reply(&self) -> String {
        self.replies()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    pub fn webhook_deleted(&self) -> bool {
        self.state.lock().unwrap().webhook_deleted
    }
}

#[async_trait]
impl BotApi for FakeBot {
    async fn fetch_updates(
        &self,
        offset: i64,
        _timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.fetch_offsets.push(offset);
            state.scripted.pop_front()
        };
        match next {
            Some(response) => response,
            None => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_file_descriptor(
        &self,
        file_id: &str,
    ) -> Result<FileDescriptor, TransportError> {
        if file_id == "panic" {
            panic!("fake bot asked to panic");
        }
        let mut state = self.state.lock().unwrap();
        state.descriptor_calls.push(file_id.to_string());
        state
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| TransportError::Api {
                code: Some(400),
                description: "Bad Request: invalid file_id".to_string(),
            })
    }

    async fn download_file(&self, path: &str) -> Result<FileStream, TransportError> {
        let bytes = {
            let mut state = self.state.lock().unwrap();
            state.downloads.push(path.to_string());
            state.contents.get(path).cloned()
        };
        let bytes = bytes.ok_or(TransportError::Status { status: 404 })?;

        // deliver in several chunks like a real body
        let chunks: Vec<Result<Bytes, TransportError>> = bytes
            .chunks(8 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn send_reply(&self, chat_id: i64, text: &str) {
        self.state
            .lock()
            .unwrap()
            .replies
            .push((chat_id, text.to_string()));
    }

    async fn delete_webhook(&self) -> Result<(), TransportError> {
        self.state.lock().unwrap().webhook_deleted = true;
        Ok(())
    }
}

/// Store that reports a duplicate filename for the first `duplicates` inserts
/// and then either delegates or fails every insert.
pub struct FlakyStore {
    pub inner: InMemoryImageStore,
    duplicates: AtomicUsize,
    always_fail: bool,
    attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn duplicates(n: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryImageStore::new(),
            duplicates: AtomicUsize::new(n),
            always_fail: false,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryImageStore::new(),
            duplicates: AtomicUsize::new(0),
            always_fail: true,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for FlakyStore {
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.duplicates.load(Ordering::SeqCst);
        if left > 0 {
            self.duplicates.store(left - 1, Ordering::SeqCst);
            return Err(PersistenceError::DuplicateFilename(record.filename));
        }
        if self.always_fail {
            return Err(PersistenceError::CorruptRow("store offline".to_string()));
        }
        self.inner.insert(record).await
    }

    async fn get_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<ImageRecord>, PersistenceError> {
        self.inner.get_by_filename(filename).await
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        self.inner.count().await
    }
}

/// Local storage where another upload grabs the first promoted name on disk
/// just before the promote lands.
pub struct ContendedStorage {
    pub inner: LocalStorage,
    pub squatter_bytes: &'static [u8],
    squatted: AtomicBool,
    squatted_name: Mutex<Option<String>>,
}

impl ContendedStorage {
    pub fn new(inner: LocalStorage, squatter_bytes: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            inner,
            squatter_bytes,
            squatted: AtomicBool::new(false),
            squatted_name: Mutex::new(None),
        })
    }

    pub fn squatted_name(&self) -> Option<String> {
        self.squatted_name.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for ContendedStorage {
    async fn stage_stream(
        &self,
        filename: &str,
        stream: ByteStream,
        max_bytes: u64,
    ) -> StorageResult<StagedFile> {
        self.inner.stage_stream(filename, stream, max_bytes).await
    }

    async fn promote(&self, staged: &StagedFile, filename: &str) -> StorageResult<u64> {
        if !self.squatted.swap(true, Ordering::SeqCst) {
            std::fs::write(self.inner.base_path().join(filename), self.squatter_bytes)?;
            *self.squatted_name.lock().unwrap() = Some(filename.to_string());
        }
        self.inner.promote(staged, filename).await
    }

    async fn discard(&self, staged: StagedFile) -> StorageResult<()> {
        self.inner.discard(staged).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        self.inner.rename(from, to).await
    }

    async fn delete(&self, filename: &str) -> StorageResult<()> {
        self.inner.delete(filename).await
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        self.inner.exists(filename).await
    }

    async fn content_length(&self, filename: &str) -> StorageResult<u64> {
        self.inner.content_length(filename).await
    }

    async fn download_stream(
        &self,
        filename: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        self.inner.download_stream(filename).await
    }
}

/// Pipeline wired to a fake bot, a temp upload directory and a chosen store.
pub struct Harness {
    pub bot: Arc<FakeBot>,
    pub storage: Arc<LocalStorage>,
    pub pipeline: Arc<IngestionPipeline>,
    pub dispatcher: Arc<UpdateDispatcher>,
    pub dir: TempDir,
}

impl Harness {
    pub async fn with_store(store: Arc<dyn ImageStore>, max_upload_bytes: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bot = FakeBot::new();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let pipeline = Arc::new(IngestionPipeline::new(
            bot.clone(),
            storage.clone(),
            store,
            BASE_URL,
            max_upload_bytes,
        ));
        let dispatcher = Arc::new(UpdateDispatcher::new(bot.clone(), pipeline.clone()));
        Self {
            bot,
            storage,
            pipeline,
            dispatcher,
            dir,
        }
    }

    pub async fn new(store: Arc<InMemoryImageStore>) -> Self {
        Self::with_store(store, MAX_UPLOAD_BYTES).await
    }

    /// Public files in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        list_visible(self.dir.path())
    }

    /// Files still sitting in the staging area.
    pub fn staged_files(&self) -> Vec<String> {
        list_visible(&self.dir.path().join(".incoming"))
    }
}

fn list_visible(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

fn base_message(chat_id: i64) -> Message {
    Message {
        message_id: 1,
        chat: Chat { id: chat_id },
        from: Some(User {
            id: USER_ID,
            is_bot: false,
            first_name: "Test".to_string(),
            username: Some("tester".to_string()),
        }),
        ..Default::default()
    }
}

pub fn text_update(update_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            text: Some(text.to_string()),
            ..base_message(CHAT_ID)
        }),
    }
}

/// What the client yields for an update whose payload failed to decode.
pub fn skipped_update(update_id: i64) -> Update {
    Update {
        update_id,
        message: None,
    }
}

/// Photo update offering a thumbnail and the full-size `file_id`.
pub fn photo_update(update_id: i64, file_id: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            photo: vec![
                PhotoSize {
                    file_id: format!("{}_thumb", file_id),
                    file_unique_id: String::new(),
                    width: 90,
                    height: 90,
                    file_size: Some(1000),
                },
                PhotoSize {
                    file_id: file_id.to_string(),
                    file_unique_id: String::new(),
                    width: 800,
                    height: 800,
                    file_size: None,
                },
            ],
            ..base_message(CHAT_ID)
        }),
    }
}

pub fn document_update(
    update_id: i64,
    file_id: &str,
    name: &str,
    mime: &str,
    size: Option<u64>,
) -> Update {
    Update {
        update_id,
        message: Some(Message {
            document: Some(Document {
                file_id: file_id.to_string(),
                file_name: Some(name.to_string()),
                mime_type: Some(mime.to_string()),
                file_size: size,
            }),
            ..base_message(CHAT_ID)
        }),
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..400 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
