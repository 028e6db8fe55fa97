use mongodb::bson::DateTime as BsonDateTime;
use serde::Deserialize;

use crate::models::{Course, CourseFilter, CourseRequest, CourseView, Role, SortBy};
use crate::services::auth_service::Claims;
use crate::state::AppState;
use crate::utils::AppError;

/// Query string of the public course catalogue
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Comma-separated categories
    pub category: Option<String>,
    /// Comma-separated levels
    pub level: Option<String>,
    /// Comma-separated languages
    pub primary_language: Option<String>,
    /// price-lowtohigh | price-hightolow | title-atoz | title-ztoa
    pub sort_by: Option<String>,
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl CatalogQuery {
    pub fn to_filter(&self) -> Result<CourseFilter, AppError> {
        let sort_by = match self.sort_by.as_deref() {
            None | Some("") => SortBy::default(),
            Some(value) => SortBy::parse(value)
                .ok_or_else(|| AppError::InvalidRequest(format!("Unknown sortBy value: {}", value)))?,
        };

        Ok(CourseFilter {
            instructor_id: None,
            published_only: true,
            categories: split_list(&self.category),
            levels: split_list(&self.level),
            languages: split_list(&self.primary_language),
            sort_by,
        })
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Course not found".to_string())
}

pub async fn list_instructor_courses(state: &AppState, claims: &Claims) -> Result<Vec<CourseView>, AppError> {
    claims.require_role(Role::Instructor)?;

    let courses = state
        .db
        .list_courses(&CourseFilter::for_instructor(&claims.id))
        .await?;

    Ok(courses.into_iter().map(CourseView::from).collect())
}

pub async fn add_course(state: &AppState, claims: &Claims, request: CourseRequest) -> Result<CourseView, AppError> {
    claims.require_role(Role::Instructor)?;

    if request.landing.title.trim().is_empty() {
        return Err(AppError::InvalidRequest("Course title is required".to_string()));
    }

    let course = Course {
        id: None,
        instructor_id: claims.id.clone(),
        instructor_name: claims.user_name.clone(),
        date: BsonDateTime::now(),
        landing: request.landing,
        is_published: request.is_published,
        students: Vec::new(),
        curriculum: request.curriculum,
    };

    let saved = state.db.insert_course(course).await?;
    log::info!("📚 Course {} created by {}", saved.id_hex(), claims.id);

    Ok(CourseView::from(saved))
}

pub async fn instructor_course_details(state: &AppState, claims: &Claims, id: &str) -> Result<CourseView, AppError> {
    claims.require_role(Role::Instructor)?;

    let course = state.db.find_course(id).await?.ok_or_else(not_found)?;
    Ok(CourseView::from(course))
}

/// Replaces landing page, curriculum and publish flag in one write.
/// There is no version check: concurrent editors overwrite each other.
pub async fn update_course(
    state: &AppState,
    claims: &Claims,
    id: &str,
    request: CourseRequest,
) -> Result<CourseView, AppError> {
    claims.require_role(Role::Instructor)?;

    let existing = state.db.find_course(id).await?.ok_or_else(not_found)?;
    if existing.instructor_id != claims.id {
        return Err(AppError::Forbidden("Only the course owner can update it".to_string()));
    }

    let updated = Course {
        landing: request.landing,
        curriculum: request.curriculum,
        is_published: request.is_published,
        ..existing
    };

    if !state.db.replace_course(id, &updated).await? {
        return Err(not_found());
    }

    log::info!("✏️ Course {} updated by {}", id, claims.id);
    Ok(CourseView::from(updated))
}

pub async fn list_catalog(state: &AppState, query: &CatalogQuery) -> Result<Vec<CourseView>, AppError> {
    let filter = query.to_filter()?;
    let courses = state.db.list_courses(&filter).await?;
    Ok(courses.into_iter().map(CourseView::from).collect())
}

pub async fn course_details(state: &AppState, id: &str) -> Result<CourseView, AppError> {
    let course = state.db.find_course(id).await?.ok_or_else(not_found)?;
    Ok(CourseView::from(course))
}

pub async fn is_enrolled(state: &AppState, claims: &Claims, course_id: &str) -> Result<bool, AppError> {
    let course = state.db.find_course(course_id).await?.ok_or_else(not_found)?;
    Ok(course.is_enrolled(&claims.id))
}

pub async fn enroll(state: &AppState, claims: &Claims, course_id: &str) -> Result<CourseView, AppError> {
    let course = state.db.find_course(course_id).await?.ok_or_else(not_found)?;
    if !course.is_published {
        return Err(AppError::InvalidRequest("Course is not published".to_string()));
    }

    if !state.db.add_student(course_id, &claims.id).await? {
        return Err(not_found());
    }

    log::info!("🎓 Student {} enrolled in {}", claims.id, course_id);
    course_details(state, course_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseLanding, Lecture};
    use crate::services::auth_service::tests::test_state;

    fn claims(id: &str, role: Role) -> Claims {
        Claims {
            id: id.into(),
            user_name: format!("user-{}", id),
            user_email: format!("{}@example.com", id),
            role,
            iat: 0,
            exp: 0,
        }
    }

    fn request(title: &str) -> CourseRequest {
        CourseRequest {
            landing: CourseLanding {
                title: title.into(),
                category: "Backend".into(),
                pricing: "49".into(),
                ..Default::default()
            },
            curriculum: vec![Lecture {
                title: "Intro".into(),
                video_url: "https://v/intro.mp4".into(),
                public_id: "courses/1-intro.mp4".into(),
                free_preview: true,
            }],
            is_published: true,
        }
    }

    #[tokio::test]
    async fn students_cannot_create_courses() {
        let state = test_state();
        let result = add_course(&state, &claims("s1", Role::Student), request("Rust")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn update_replaces_content_but_keeps_owner_and_students() {
        let state = test_state();
        let owner = claims("i1", Role::Instructor);
        let created = add_course(&state, &owner, request("Rust")).await.unwrap();
        enroll(&state, &claims("s1", Role::Student), &created.id).await.unwrap();

        let mut changed = request("Rust, revised");
        changed.curriculum.clear();
        let updated = update_course(&state, &owner, &created.id, changed).await.unwrap();

        assert_eq!(updated.landing.title, "Rust, revised");
        assert!(updated.curriculum.is_empty());
        assert_eq!(updated.instructor_id, "i1");
        assert_eq!(updated.students, vec!["s1"]);

        let stored = course_details(&state, &created.id).await.unwrap();
        assert_eq!(stored.landing.title, "Rust, revised");
    }

    #[tokio::test]
    async fn only_the_owner_may_update() {
        let state = test_state();
        let created = add_course(&state, &claims("i1", Role::Instructor), request("Rust")).await.unwrap();
        let result = update_course(&state, &claims("i2", Role::Instructor), &created.id, request("Mine")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn catalog_hides_drafts_and_rejects_unknown_sort() {
        let state = test_state();
        let owner = claims("i1", Role::Instructor);
        add_course(&state, &owner, request("Published")).await.unwrap();
        let mut draft = request("Draft");
        draft.is_published = false;
        add_course(&state, &owner, draft).await.unwrap();

        let listed = list_catalog(&state, &CatalogQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].landing.title, "Published");

        let bad = CatalogQuery { sort_by: Some("random".into()), ..Default::default() };
        assert!(matches!(list_catalog(&state, &bad).await, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn enrollment_is_reported_by_purchase_info() {
        let state = test_state();
        let created = add_course(&state, &claims("i1", Role::Instructor), request("Rust")).await.unwrap();
        let student = claims("s1", Role::Student);

        assert!(!is_enrolled(&state, &student, &created.id).await.unwrap());
        enroll(&state, &student, &created.id).await.unwrap();
        assert!(is_enrolled(&state, &student, &created.id).await.unwrap());
    }
}
