#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crowdin_sync::adapter::DocumentI18nAdapter;
use crowdin_sync::bridge::BackendContext;
use crowdin_sync::codec::HtmlCodec;
use crowdin_sync::error::{Result, SyncError};
use crowdin_sync::store::memory::MemoryStore;
use crowdin_sync::vendor::{CreateFileRequest, Directory, Project, SourceFile, StorageRef, VendorClient};

pub const PROJECT_ID: u64 = 11;

/// In-memory Crowdin: keeps uploaded storages and files, serves canned translations.
#[derive(Default)]
pub struct FakeVendor {
    storages: Mutex<HashMap<u64, (String, String)>>,
    files: Mutex<HashMap<u64, SourceFile>>,
    file_content: Mutex<HashMap<u64, String>>,
    translations: Mutex<HashMap<(u64, String), String>>,
    directories: Mutex<Vec<Directory>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl FakeVendor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_translation(&self, file_id: u64, lang: &str, markup: String) {
        self.translations
            .lock()
            .unwrap()
            .insert((file_id, lang.to_string()), markup);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn file(&self, file_id: u64) -> Option<SourceFile> {
        self.files.lock().unwrap().get(&file_id).cloned()
    }

    pub fn file_content(&self, file_id: u64) -> Option<String> {
        self.file_content.lock().unwrap().get(&file_id).cloned()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn next_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }

    fn check_project(project_id: u64) -> Result<()> {
        if project_id != PROJECT_ID {
            return Err(SyncError::vendor("Crowdin API error", format!("404 project {}", project_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl VendorClient for FakeVendor {
    async fn add_storage(&self, file_name: &str, content: String) -> Result<StorageRef> {
        self.record("add_storage");
        let id = self.next_id();
        self.storages
            .lock()
            .unwrap()
            .insert(id, (file_name.to_string(), content));
        Ok(StorageRef {
            id,
            file_name: file_name.to_string(),
        })
    }

    async fn list_directories(&self, project_id: u64) -> Result<Vec<Directory>> {
        self.record("list_directories");
        Self::check_project(project_id)?;
        Ok(self.directories.lock().unwrap().clone())
    }

    async fn create_directory(&self, project_id: u64, name: &str) -> Result<Directory> {
        self.record("create_directory");
        Self::check_project(project_id)?;
        let directory = Directory {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.directories.lock().unwrap().push(directory.clone());
        Ok(directory)
    }

    async fn create_file(&self, project_id: u64, request: CreateFileRequest) -> Result<SourceFile> {
        self.record("create_file");
        Self::check_project(project_id)?;
        let (_, content) = self
            .storages
            .lock()
            .unwrap()
            .remove(&request.storage_id)
            .ok_or_else(|| SyncError::vendor("Crowdin API error", "unknown storage"))?;

        let mut extra = Map::new();
        extra.insert("context".into(), Value::String(request.context));
        extra.insert("excludedTargetLanguages".into(), json!(request.excluded_target_languages));
        extra.insert("directoryId".into(), json!(request.directory_id));
        let file = SourceFile {
            id: self.next_id(),
            name: request.name,
            title: Some(request.title),
            extra,
        };
        self.files.lock().unwrap().insert(file.id, file.clone());
        self.file_content.lock().unwrap().insert(file.id, content);
        Ok(file)
    }

    async fn update_or_restore_file(&self, project_id: u64, file_id: u64, storage_id: u64) -> Result<SourceFile> {
        self.record("update_or_restore_file");
        Self::check_project(project_id)?;
        let file = self
            .file(file_id)
            .ok_or_else(|| SyncError::vendor("Crowdin API error", "404 file"))?;
        let (_, content) = self
            .storages
            .lock()
            .unwrap()
            .remove(&storage_id)
            .ok_or_else(|| SyncError::vendor("Crowdin API error", "unknown storage"))?;
        self.file_content.lock().unwrap().insert(file_id, content);
        Ok(file)
    }

    async fn download_source_file(&self, project_id: u64, file_id: u64) -> Result<String> {
        self.record("download_source_file");
        Self::check_project(project_id)?;
        self.file_content(file_id)
            .ok_or_else(|| SyncError::vendor("Crowdin API error", "404 file"))
    }

    async fn get_file_progress(&self, project_id: u64, file_id: u64) -> Result<Vec<Value>> {
        self.record("get_file_progress");
        Self::check_project(project_id)?;
        if self.file(file_id).is_none() {
            return Err(SyncError::vendor("Crowdin API error", "404 file"));
        }
        Ok(vec![json!({ "languageId": "fr", "translationProgress": 100, "approvalProgress": 50 })])
    }

    async fn get_project(&self, project_id: u64) -> Result<Project> {
        self.record("get_project");
        Self::check_project(project_id)?;
        Ok(Project {
            id: project_id,
            name: "Website".into(),
            source_language_id: Some("en".into()),
            target_language_ids: vec!["fr".into(), "de".into(), "pt-BR".into()],
            extra: Map::new(),
        })
    }

    async fn build_file_translation(&self, project_id: u64, file_id: u64, target_language_id: &str) -> Result<String> {
        self.record("build_file_translation");
        Self::check_project(project_id)?;
        self.translations
            .lock()
            .unwrap()
            .get(&(file_id, target_language_id.to_string()))
            .cloned()
            .ok_or_else(|| SyncError::vendor("Crowdin API error", "no translation built"))
    }
}

pub fn context(vendor: Arc<FakeVendor>, store: Arc<MemoryStore>) -> BackendContext {
    let codec = Arc::new(HtmlCodec::default());
    BackendContext {
        store,
        vendor,
        adapter: Arc::new(DocumentI18nAdapter::new("locale", "pathname", codec.clone())),
        codec,
        project_id: PROJECT_ID,
        supported_target_langs: vec!["fr".into(), "de".into(), "pt-br".into()],
        directories: Vec::new(),
        pathname_field: "pathname".into(),
    }
}
