//! Course authoring: landing-page fields, the editable curriculum and the
//! per-lecture upload bookkeeping behind the instructor's "create course" form.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::client::ClientError;
use crate::models::{CourseLanding, CourseRequest, CourseView, Lecture};
use crate::services::media_service::UploadedMedia;
use crate::storage::{course_object_path, ObjectStorage, StorageError, StoredObject, UploadProgress};

pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Server operations the editor needs. `LmsClient` is the HTTP implementation.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn upload_media(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> Result<UploadedMedia, ClientError>;
    async fn add_course(&self, course: &CourseRequest) -> Result<CourseView, ClientError>;
    async fn update_course(&self, id: &str, course: &CourseRequest) -> Result<CourseView, ClientError>;
    async fn course_details(&self, id: &str) -> Result<CourseView, ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Uploading { percent: f64 },
    Completed,
    Failed(String),
}

/// Identity of a lecture inside one editor. Indexes shift on delete, keys never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LectureKey(u64);

/// Upload status per lecture
#[derive(Debug, Default)]
pub struct UploadTracker {
    entries: Mutex<BTreeMap<LectureKey, UploadState>>,
}

impl UploadTracker {
    pub fn get(&self, key: LectureKey) -> Option<UploadState> {
        self.entries.lock().ok().and_then(|e| e.get(&key).cloned())
    }

    pub fn set(&self, key: LectureKey, state: UploadState) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, state);
        }
    }

    pub fn is_uploading(&self, key: LectureKey) -> bool {
        matches!(self.get(key), Some(UploadState::Uploading { .. }))
    }

    pub fn remove(&self, key: LectureKey) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// One lecture upload in flight. The transfer borrows only the ticket, so the
/// editor stays free for other uploads and edits until [`CurriculumEditor::finish_upload`].
#[derive(Debug)]
pub struct UploadTicket {
    key: LectureKey,
    path: String,
    uploads: Arc<UploadTracker>,
}

impl UploadTicket {
    pub fn key(&self) -> LectureKey {
        self.key
    }

    /// Storage path the file is written to
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn transfer(
        &self,
        storage: &dyn ObjectStorage,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let uploads = &self.uploads;
        let key = self.key;
        storage
            .upload(&self.path, content_type, data, &|p: UploadProgress| {
                uploads.set(key, UploadState::Uploading { percent: p.percent() });
            })
            .await
    }
}

/// Image picked for the course landing page, uploaded on submit
#[derive(Debug, Clone)]
pub struct CourseImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub enum AuthoringError {
    NoSuchLecture(usize),
    /// The lecture was deleted while its file was uploading; carries the stored path
    LectureRemoved(String),
    NotSubmittable,
    Storage(StorageError),
    Api(ClientError),
}

impl fmt::Display for AuthoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthoringError::NoSuchLecture(i) => write!(f, "No lecture at index {}", i),
            AuthoringError::LectureRemoved(path) => write!(f, "Lecture was removed while {} uploaded", path),
            AuthoringError::NotSubmittable => write!(f, "Course form is incomplete"),
            AuthoringError::Storage(e) => write!(f, "{}", e),
            AuthoringError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthoringError {}

impl From<ClientError> for AuthoringError {
    fn from(e: ClientError) -> Self {
        AuthoringError::Api(e)
    }
}

fn initial_curriculum() -> Vec<Lecture> {
    vec![Lecture::default()]
}

/// Form state for creating or editing one course
#[derive(Debug)]
pub struct CurriculumEditor {
    pub landing: CourseLanding,
    lectures: Vec<Lecture>,
    keys: Vec<LectureKey>,
    next_key: u64,
    uploads: Arc<UploadTracker>,
    editing: Option<String>,
}

impl Default for CurriculumEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl CurriculumEditor {
    pub fn new() -> Self {
        let mut editor = Self {
            landing: CourseLanding::default(),
            lectures: Vec::new(),
            keys: Vec::new(),
            next_key: 0,
            uploads: Arc::new(UploadTracker::default()),
            editing: None,
        };
        editor.replace_lectures(initial_curriculum());
        editor
    }

    pub fn lectures(&self) -> &[Lecture] {
        &self.lectures
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn key(&self, index: usize) -> Option<LectureKey> {
        self.keys.get(index).copied()
    }

    pub fn upload_state(&self, index: usize) -> Option<UploadState> {
        self.key(index).and_then(|key| self.uploads.get(key))
    }

    pub fn is_uploading(&self, index: usize) -> bool {
        self.key(index).map_or(false, |key| self.uploads.is_uploading(key))
    }

    /// Id of the course being edited, `None` when creating
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    fn fresh_key(&mut self) -> LectureKey {
        self.next_key += 1;
        LectureKey(self.next_key)
    }

    fn replace_lectures(&mut self, lectures: Vec<Lecture>) {
        let keys = (0..lectures.len()).map(|_| self.fresh_key()).collect();
        self.keys = keys;
        self.lectures = lectures;
    }

    fn lecture_mut(&mut self, index: usize) -> Result<&mut Lecture, AuthoringError> {
        self.lectures
            .get_mut(index)
            .ok_or(AuthoringError::NoSuchLecture(index))
    }

    pub fn add_lecture(&mut self) -> usize {
        let key = self.fresh_key();
        self.lectures.push(Lecture::default());
        self.keys.push(key);
        self.lectures.len() - 1
    }

    pub fn set_title(&mut self, index: usize, title: &str) -> Result<(), AuthoringError> {
        self.lecture_mut(index)?.title = title.to_string();
        Ok(())
    }

    pub fn set_free_preview(&mut self, index: usize, free_preview: bool) -> Result<(), AuthoringError> {
        self.lecture_mut(index)?.free_preview = free_preview;
        Ok(())
    }

    /// Removes a lecture. Its stored video is deleted on a best-effort basis:
    /// a storage failure is logged and the lecture is removed anyway.
    pub async fn delete_lecture(&mut self, index: usize, storage: &dyn ObjectStorage) -> Result<Lecture, AuthoringError> {
        let public_id = self
            .lectures
            .get(index)
            .ok_or(AuthoringError::NoSuchLecture(index))?
            .public_id
            .clone();

        if !public_id.is_empty() {
            if let Err(e) = storage.delete(&public_id).await {
                log::warn!("⚠️ Failed to delete {} from storage: {}", public_id, e);
            }
        }

        let removed = self.lectures.remove(index);
        let key = self.keys.remove(index);
        self.uploads.remove(key);
        Ok(removed)
    }

    /// Marks the lecture as uploading and hands out the ticket that runs the transfer
    pub fn begin_upload(&self, index: usize, file_name: &str) -> Result<UploadTicket, AuthoringError> {
        let key = self.key(index).ok_or(AuthoringError::NoSuchLecture(index))?;
        self.uploads.set(key, UploadState::Uploading { percent: 0.0 });

        Ok(UploadTicket {
            key,
            path: course_object_path(file_name),
            uploads: Arc::clone(&self.uploads),
        })
    }

    /// Writes a finished transfer into the lecture the ticket was issued for,
    /// wherever that lecture sits now.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<StoredObject, StorageError>,
    ) -> Result<(), AuthoringError> {
        let index = if Arc::ptr_eq(&ticket.uploads, &self.uploads) {
            self.keys.iter().position(|k| *k == ticket.key)
        } else {
            None
        };

        match (index, result) {
            (Some(index), Ok(stored)) => {
                let lecture = self.lecture_mut(index)?;
                lecture.video_url = stored.url;
                lecture.public_id = stored.path;
                self.uploads.set(ticket.key, UploadState::Completed);
                Ok(())
            }
            (None, Ok(stored)) => {
                log::warn!("⚠️ Lecture removed while {} was uploading", stored.path);
                ticket.uploads.remove(ticket.key);
                Err(AuthoringError::LectureRemoved(stored.path))
            }
            (index, Err(e)) => {
                log::error!("❌ Upload of {} failed: {}", ticket.path, e);
                match index {
                    Some(_) => self
                        .uploads
                        .set(ticket.key, UploadState::Failed(UPLOAD_FAILED_MESSAGE.to_string())),
                    None => ticket.uploads.remove(ticket.key),
                }
                Err(AuthoringError::Storage(e))
            }
        }
    }

    /// Uploads a lecture video and writes its URL and storage path into the record
    pub async fn upload_lecture_media(
        &mut self,
        index: usize,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        storage: &dyn ObjectStorage,
    ) -> Result<(), AuthoringError> {
        let ticket = self.begin_upload(index, file_name)?;
        let result = ticket.transfer(storage, content_type, data).await;
        self.finish_upload(ticket, result)
    }

    /// Submit gate: every landing field filled, every lecture has a title,
    /// a video and a storage path, and at least one lecture is a free preview.
    pub fn is_submittable(&self) -> bool {
        let landing_ok = self
            .landing
            .required_fields()
            .iter()
            .all(|(_, value)| !value.is_empty());

        let lectures_ok = self
            .lectures
            .iter()
            .all(|l| !l.title.is_empty() && !l.video_url.is_empty() && !l.public_id.is_empty());

        landing_ok && lectures_ok && self.lectures.iter().any(|l| l.free_preview)
    }

    /// Creates the course, or updates it when editing. A failed image upload
    /// does not stop the submit; the course is saved without the new image.
    pub async fn submit(&mut self, api: &dyn CourseApi, image: Option<CourseImage>) -> Result<CourseView, AuthoringError> {
        if !self.is_submittable() {
            return Err(AuthoringError::NotSubmittable);
        }

        let mut landing = self.landing.clone();
        if let Some(image) = image {
            match api.upload_media(&image.file_name, &image.content_type, image.data).await {
                Ok(media) => landing.image = media.url,
                Err(e) => log::warn!("⚠️ Course image upload failed, continuing without it: {}", e),
            }
        }

        let request = CourseRequest {
            landing,
            curriculum: self.lectures.clone(),
            is_published: true,
        };

        let saved = match self.editing.as_deref() {
            Some(id) => api.update_course(id, &request).await?,
            None => api.add_course(&request).await?,
        };

        self.reset();
        Ok(saved)
    }

    pub fn reset(&mut self) {
        self.landing = CourseLanding::default();
        self.replace_lectures(initial_curriculum());
        self.uploads.clear();
        self.editing = None;
    }

    /// Fills the form from an existing course and switches submit to update
    pub fn load_for_edit(&mut self, course: CourseView) {
        self.uploads.clear();
        self.editing = Some(course.id);
        self.landing = course.landing;
        self.replace_lectures(course.curriculum);
    }

    pub async fn fetch_for_edit(&mut self, api: &dyn CourseApi, id: &str) -> Result<(), AuthoringError> {
        let course = api.course_details(id).await?;
        self.load_for_edit(course);
        Ok(())
    }
}
