pub mod auth_service;
pub mod course_service;
pub mod media_service;
