use mongodb::bson::DateTime as BsonDateTime;
use mongodb::bson::oid::ObjectId;

use crate::database::Repository;
use crate::models::{Course, CourseLanding, Lecture, Role, Theme, User};
use crate::services::auth_service::hash_password;
use crate::utils::AppError;

pub const DEMO_INSTRUCTOR_EMAIL: &str = "instructor@example.com";
pub const DEMO_PASSWORD: &str = "password123";

/// Accounts available in mock mode. Passwords are hashed here, at start-up.
pub fn mock_users() -> Result<Vec<User>, AppError> {
    Ok(vec![
        User {
            id: Some(ObjectId::new()),
            user_name: "Test User".into(),
            user_email: "student@example.com".into(),
            password: hash_password(DEMO_PASSWORD)?,
            role: Role::Student,
            theme: Some(Theme::Light),
        },
        demo_instructor()?,
    ])
}

fn demo_instructor() -> Result<User, AppError> {
    Ok(User {
        id: Some(ObjectId::new()),
        user_name: "Test Instructor".into(),
        user_email: DEMO_INSTRUCTOR_EMAIL.into(),
        password: hash_password(DEMO_PASSWORD)?,
        role: Role::Instructor,
        theme: Some(Theme::Dark),
    })
}

fn sample_course(instructor: &User, landing: CourseLanding, curriculum: Vec<Lecture>) -> Course {
    Course {
        id: None,
        instructor_id: instructor.id_hex(),
        instructor_name: instructor.user_name.clone(),
        date: BsonDateTime::now(),
        landing,
        is_published: true,
        students: Vec::new(),
        curriculum,
    }
}

/// Published sample courses owned by `instructor`
pub fn mock_courses(instructor: &User) -> Vec<Course> {
    vec![
        sample_course(
            instructor,
            CourseLanding {
                title: "React Fundamentals".into(),
                category: "web-development".into(),
                level: "beginner".into(),
                primary_language: "english".into(),
                subtitle: "Components, state and hooks".into(),
                description: "Build interactive interfaces with React from first principles.".into(),
                pricing: "99.99".into(),
                objectives: "Write function components,Manage state with hooks".into(),
                welcome_message: "Welcome to React Fundamentals!".into(),
                image: "https://picsum.photos/300/150?random=9".into(),
            },
            vec![Lecture {
                title: "Why React".into(),
                video_url: "https://mock-storage.com/uploads/courses/0-why-react.mp4".into(),
                public_id: "courses/0-why-react.mp4".into(),
                free_preview: true,
            }],
        ),
        sample_course(
            instructor,
            CourseLanding {
                title: "Node.js Backend".into(),
                category: "backend-development".into(),
                level: "intermediate".into(),
                primary_language: "english".into(),
                subtitle: "REST APIs with Express and MongoDB".into(),
                description: "Design, secure and deploy a JSON API.".into(),
                pricing: "129.99".into(),
                objectives: "Structure an Express app,Authenticate with JWT".into(),
                welcome_message: "Welcome to Node.js Backend!".into(),
                image: "https://picsum.photos/300/150?random=10".into(),
            },
            vec![Lecture {
                title: "Project setup".into(),
                video_url: "https://mock-storage.com/uploads/courses/0-setup.mp4".into(),
                public_id: "courses/0-setup.mp4".into(),
                free_preview: true,
            }],
        ),
    ]
}

/// Creates the demo instructor if missing, and the sample courses when the
/// course collection is empty. Safe to run on every start.
pub async fn seed_demo_data(db: &dyn Repository) -> Result<(), AppError> {
    let instructor = match db.find_user_by_email(DEMO_INSTRUCTOR_EMAIL).await? {
        Some(existing) => {
            log::info!("🌱 Demo instructor already present - skipping");
            existing
        }
        None => {
            let mut user = demo_instructor()?;
            user.id = None;
            let saved = db.insert_user(user).await?;
            log::info!("🌱 Demo instructor created: {}", DEMO_INSTRUCTOR_EMAIL);
            saved
        }
    };

    let count = db.count_courses().await?;
    if count > 0 {
        log::info!("🌱 {} courses already in store - skipping sample courses", count);
        return Ok(());
    }

    for course in mock_courses(&instructor) {
        db.insert_course(course).await?;
    }
    log::info!("   ✅ Sample courses seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDb;
    use crate::models::CourseFilter;

    #[test]
    fn mock_passwords_are_hashed() {
        let users = mock_users().unwrap();
        assert_eq!(users.len(), 2);
        for user in &users {
            assert_ne!(user.password, DEMO_PASSWORD);
            assert!(bcrypt::verify(DEMO_PASSWORD, &user.password).unwrap());
        }
    }

    #[test]
    fn mock_courses_belong_to_the_instructor() {
        let users = mock_users().unwrap();
        let instructor = users.iter().find(|u| u.role == Role::Instructor).unwrap();
        for course in mock_courses(instructor) {
            assert_eq!(course.instructor_id, instructor.id_hex());
            assert!(course.curriculum.iter().any(|l| l.free_preview));
        }
    }

    #[tokio::test]
    async fn seeding_twice_does_not_duplicate() {
        let db = MemoryDb::new();
        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();

        assert_eq!(db.count_courses().await.unwrap(), 2);
        let instructor = db.find_user_by_email(DEMO_INSTRUCTOR_EMAIL).await.unwrap().unwrap();
        let owned = db
            .list_courses(&CourseFilter::for_instructor(&instructor.id_hex()))
            .await
            .unwrap();
        assert_eq!(owned.len(), 2);
    }
}
