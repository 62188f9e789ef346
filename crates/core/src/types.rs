/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Free-form JSON object used for form data, variables and step metadata.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
