use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::sync::RwLock;

use super::Repository;
use crate::models::{Course, CourseFilter, Theme, User};
use crate::utils::AppError;

/// In-memory store backing mock mode and the handler tests
#[derive(Default)]
pub struct MemoryDb {
    users: RwLock<Vec<User>>,
    courses: RwLock<Vec<Course>>,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("memory store lock poisoned".to_string())
}

fn same_id(id: Option<ObjectId>, hex: &str) -> bool {
    id.map(|id| id.to_hex() == hex).unwrap_or(false)
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixtures(users: Vec<User>, courses: Vec<Course>) -> Self {
        let assign = |id: Option<ObjectId>| id.or_else(|| Some(ObjectId::new()));
        Self {
            users: RwLock::new(
                users
                    .into_iter()
                    .map(|mut u| {
                        u.id = assign(u.id);
                        u
                    })
                    .collect(),
            ),
            courses: RwLock::new(
                courses
                    .into_iter()
                    .map(|mut c| {
                        c.id = assign(c.id);
                        c
                    })
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl Repository for MemoryDb {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.user_email == email).cloned())
    }

    async fn find_user_by_email_or_name(&self, email: &str, user_name: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .iter()
            .find(|u| u.user_email == email || u.user_name == user_name)
            .cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| same_id(u.id, id)).cloned())
    }

    async fn insert_user(&self, mut user: User) -> Result<User, AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .iter()
            .any(|u| u.user_email == user.user_email || u.user_name == user.user_name)
        {
            return Err(AppError::InvalidRequest(
                "User name or user email already exists".to_string(),
            ));
        }
        user.id = Some(ObjectId::new());
        users.push(user.clone());
        Ok(user)
    }

    async fn set_user_theme(&self, id: &str, theme: Theme) -> Result<bool, AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        match users.iter_mut().find(|u| same_id(u.id, id)) {
            Some(user) => {
                user.theme = Some(theme);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, AppError> {
        let courses = self.courses.read().map_err(poisoned)?;
        let mut matching: Vec<Course> = courses.iter().filter(|c| filter.matches(c)).cloned().collect();
        filter.sort(&mut matching);
        Ok(matching)
    }

    async fn count_courses(&self) -> Result<u64, AppError> {
        Ok(self.courses.read().map_err(poisoned)?.len() as u64)
    }

    async fn find_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.iter().find(|c| same_id(c.id, id)).cloned())
    }

    async fn insert_course(&self, mut course: Course) -> Result<Course, AppError> {
        course.id = Some(ObjectId::new());
        self.courses.write().map_err(poisoned)?.push(course.clone());
        Ok(course)
    }

    async fn replace_course(&self, id: &str, course: &Course) -> Result<bool, AppError> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        match courses.iter_mut().find(|c| same_id(c.id, id)) {
            Some(existing) => {
                let kept_id = existing.id;
                *existing = course.clone();
                existing.id = kept_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<bool, AppError> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        match courses.iter_mut().find(|c| same_id(c.id, course_id)) {
            Some(course) => {
                if !course.is_enrolled(student_id) {
                    course.students.push(student_id.to_string());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseLanding, Role};
    use mongodb::bson::DateTime as BsonDateTime;

    fn user(name: &str, email: &str) -> User {
        User {
            id: None,
            user_name: name.into(),
            user_email: email.into(),
            password: "hash".into(),
            role: Role::Student,
            theme: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_or_name_is_rejected() {
        let db = MemoryDb::new();
        db.insert_user(user("ada", "ada@example.com")).await.unwrap();

        let same_email = db.insert_user(user("other", "ada@example.com")).await;
        assert!(matches!(same_email, Err(AppError::InvalidRequest(_))));

        let same_name = db.insert_user(user("ada", "new@example.com")).await;
        assert!(matches!(same_name, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn enrolling_twice_keeps_one_entry() {
        let db = MemoryDb::new();
        let course = db
            .insert_course(Course {
                id: None,
                instructor_id: "i1".into(),
                instructor_name: "Ins".into(),
                date: BsonDateTime::now(),
                landing: CourseLanding::default(),
                is_published: true,
                students: vec![],
                curriculum: vec![],
            })
            .await
            .unwrap();
        let id = course.id_hex();

        assert!(db.add_student(&id, "s1").await.unwrap());
        assert!(db.add_student(&id, "s1").await.unwrap());
        assert_eq!(db.find_course(&id).await.unwrap().unwrap().students, vec!["s1"]);
        assert!(!db.add_student("000000000000000000000000", "s1").await.unwrap());
    }
}
