pub mod memory;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Collection, Database, IndexModel};
use mongodb::options::IndexOptions;

use crate::models::{Course, CourseFilter, Theme, User};
use crate::utils::AppError;

pub use memory::MemoryDb;

const USERS: &str = "users";
const COURSES: &str = "courses";
const DUPLICATE_KEY: i32 = 11000;

/// Persistence seam between the handlers and the document store
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email_or_name(&self, email: &str, user_name: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    /// Stores a new user and returns it with its id assigned
    async fn insert_user(&self, user: User) -> Result<User, AppError>;
    async fn set_user_theme(&self, id: &str, theme: Theme) -> Result<bool, AppError>;

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, AppError>;
    async fn count_courses(&self) -> Result<u64, AppError>;
    async fn find_course(&self, id: &str) -> Result<Option<Course>, AppError>;
    async fn insert_course(&self, course: Course) -> Result<Course, AppError>;
    /// Whole-document replace; returns false when no course has that id
    async fn replace_course(&self, id: &str, course: &Course) -> Result<bool, AppError>;
    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, database_name: Option<&str>) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Explicit name, then the URI path, then "lms"
        let db_name = database_name
            .map(|s| s.to_string())
            .or_else(|| {
                uri.rsplit('/')
                    .next()
                    .and_then(|s| s.split('?').next())
                    .filter(|s| !s.is_empty() && !s.contains(':') && !s.contains('@'))
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "lms".to_string());

        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;
        log::info!("✅ Connected to MongoDB database: {}", db_name);

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Uniqueness of email and username lives in the indexes
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<Document>(USERS);
        for field in ["userEmail", "userName"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();

            match users.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: users({}) unique", field),
                Err(e) => log::warn!("   ⚠️  Could not create users({}) index: {}", field, e),
            }
        }

        let courses = self.collection::<Document>(COURSES);
        let instructor_index = IndexModel::builder()
            .keys(doc! { "instructorId": 1 })
            .build();

        match courses.create_index(instructor_index).await {
            Ok(_) => log::info!("   ✅ Index created: courses(instructorId)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

fn course_filter_doc(filter: &CourseFilter) -> Document {
    let mut query = doc! {};

    if let Some(instructor_id) = &filter.instructor_id {
        query.insert("instructorId", instructor_id.clone());
    }
    if filter.published_only {
        // Documents written by the old seeding script carry the misspelled flag
        query.insert("$or", vec![doc! { "isPublished": true }, doc! { "isPublised": true }]);
    }
    if !filter.categories.is_empty() {
        query.insert("category", doc! { "$in": filter.categories.clone() });
    }
    if !filter.levels.is_empty() {
        query.insert("level", doc! { "$in": filter.levels.clone() });
    }
    if !filter.languages.is_empty() {
        query.insert("primaryLanguage", doc! { "$in": filter.languages.clone() });
    }

    query
}

#[async_trait]
impl Repository for MongoDB {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "userEmail": email })
            .await?)
    }

    async fn find_user_by_email_or_name(&self, email: &str, user_name: &str) -> Result<Option<User>, AppError> {
        let filter = doc! {
            "$or": [
                { "userEmail": email },
                { "userName": user_name }
            ]
        };
        Ok(self.collection::<User>(USERS).find_one(filter).await?)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "_id": object_id })
            .await?)
    }

    async fn insert_user(&self, mut user: User) -> Result<User, AppError> {
        match self.collection::<User>(USERS).insert_one(&user).await {
            Ok(result) => {
                user.id = result.inserted_id.as_object_id();
                Ok(user)
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::InvalidRequest(
                "User name or user email already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_user_theme(&self, id: &str, theme: Theme) -> Result<bool, AppError> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(false);
        };
        let result = self
            .collection::<Document>(USERS)
            .update_one(doc! { "_id": object_id }, doc! { "$set": { "theme": theme.as_str() } })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, AppError> {
        let cursor = self
            .collection::<Course>(COURSES)
            .find(course_filter_doc(filter))
            .await?;
        let mut courses: Vec<Course> = cursor.try_collect().await?;
        // Pricing is stored as text, so numeric ordering happens here
        filter.sort(&mut courses);
        Ok(courses)
    }

    async fn count_courses(&self) -> Result<u64, AppError> {
        Ok(self.collection::<Document>(COURSES).count_documents(doc! {}).await?)
    }

    async fn find_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        Ok(self
            .collection::<Course>(COURSES)
            .find_one(doc! { "_id": object_id })
            .await?)
    }

    async fn insert_course(&self, mut course: Course) -> Result<Course, AppError> {
        let result = self.collection::<Course>(COURSES).insert_one(&course).await?;
        course.id = result.inserted_id.as_object_id();
        Ok(course)
    }

    async fn replace_course(&self, id: &str, course: &Course) -> Result<bool, AppError> {
        let Ok(object_id) = ObjectId::parse_str(id) else {
            return Ok(false);
        };
        let result = self
            .collection::<Course>(COURSES)
            .replace_one(doc! { "_id": object_id }, course)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<bool, AppError> {
        let Ok(object_id) = ObjectId::parse_str(course_id) else {
            return Ok(false);
        };
        let result = self
            .collection::<Document>(COURSES)
            .update_one(
                doc! { "_id": object_id },
                doc! { "$addToSet": { "students": student_id } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.db.list_collection_names().await?;
        Ok(true)
    }
}
