use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One lecture record inside a course curriculum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub video_url: String,
    /// Storage object path of the uploaded video
    #[serde(rename = "public_id", default)]
    pub public_id: String,
    #[serde(default)]
    pub free_preview: bool,
}

/// Landing-page fields edited by the instructor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseLanding {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub primary_language: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub pricing: String,
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub image: String,
}

impl CourseLanding {
    /// Fields that must be non-empty before a course can be submitted
    pub fn required_fields(&self) -> [(&'static str, &str); 9] {
        [
            ("title", &self.title),
            ("category", &self.category),
            ("level", &self.level),
            ("primaryLanguage", &self.primary_language),
            ("subtitle", &self.subtitle),
            ("description", &self.description),
            ("pricing", &self.pricing),
            ("objectives", &self.objectives),
            ("welcomeMessage", &self.welcome_message),
        ]
    }

    pub fn price(&self) -> f64 {
        self.pricing.trim().parse::<f64>().unwrap_or(0.0)
    }
}

/// Document stored in the `courses` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub instructor_id: String,
    pub instructor_name: String,
    /// Stored as a BSON date so existing documents and date queries keep working
    pub date: BsonDateTime,
    #[serde(flatten)]
    pub landing: CourseLanding,
    #[serde(default, alias = "isPublised")]
    pub is_published: bool,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default)]
    pub curriculum: Vec<Lecture>,
}

impl Course {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s == student_id)
    }
}

/// Body of the create and update course endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    #[serde(flatten)]
    pub landing: CourseLanding,
    #[serde(default)]
    pub curriculum: Vec<Lecture>,
    #[serde(default = "default_published", alias = "isPublised")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

/// API view of a course
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    #[serde(rename = "_id")]
    pub id: String,
    pub instructor_id: String,
    pub instructor_name: String,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub landing: CourseLanding,
    pub is_published: bool,
    pub students: Vec<String>,
    pub curriculum: Vec<Lecture>,
}

impl From<Course> for CourseView {
    fn from(c: Course) -> Self {
        CourseView {
            id: c.id_hex(),
            instructor_id: c.instructor_id,
            instructor_name: c.instructor_name,
            date: DateTime::<Utc>::from_timestamp_millis(c.date.timestamp_millis()).unwrap_or_default(),
            landing: c.landing,
            is_published: c.is_published,
            students: c.students,
            curriculum: c.curriculum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    PriceLowToHigh,
    PriceHighToLow,
    TitleAToZ,
    TitleZToA,
}

impl SortBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "price-lowtohigh" => Some(SortBy::PriceLowToHigh),
            "price-hightolow" => Some(SortBy::PriceHighToLow),
            "title-atoz" => Some(SortBy::TitleAToZ),
            "title-ztoa" => Some(SortBy::TitleZToA),
            _ => None,
        }
    }
}

/// Listing filter shared by the Mongo and in-memory stores
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub instructor_id: Option<String>,
    pub published_only: bool,
    pub categories: Vec<String>,
    pub levels: Vec<String>,
    pub languages: Vec<String>,
    pub sort_by: SortBy,
}

impl CourseFilter {
    pub fn for_instructor(instructor_id: &str) -> Self {
        CourseFilter {
            instructor_id: Some(instructor_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, course: &Course) -> bool {
        let in_list = |list: &[String], value: &str| list.is_empty() || list.iter().any(|v| v == value);

        self.instructor_id
            .as_deref()
            .map_or(true, |id| course.instructor_id == id)
            && (!self.published_only || course.is_published)
            && in_list(&self.categories, &course.landing.category)
            && in_list(&self.levels, &course.landing.level)
            && in_list(&self.languages, &course.landing.primary_language)
    }

    pub fn sort(&self, courses: &mut [Course]) {
        match self.sort_by {
            SortBy::PriceLowToHigh => courses.sort_by(|a, b| a.landing.price().total_cmp(&b.landing.price())),
            SortBy::PriceHighToLow => courses.sort_by(|a, b| b.landing.price().total_cmp(&a.landing.price())),
            SortBy::TitleAToZ => courses.sort_by(|a, b| a.landing.title.cmp(&b.landing.title)),
            SortBy::TitleZToA => courses.sort_by(|a, b| b.landing.title.cmp(&a.landing.title)),
        }
    }
}

/// Pricing arrives as a form string from the client but as a number from fixtures
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<TextOrNumber>::deserialize(deserializer)? {
        Some(TextOrNumber::Text(s)) => s,
        Some(TextOrNumber::Int(i)) => i.to_string(),
        Some(TextOrNumber::Float(f)) => f.to_string(),
        None => String::new(),
    })
}
