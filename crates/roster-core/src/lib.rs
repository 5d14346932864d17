pub mod export;
pub mod store;

pub use store::{StoreError, UserStore};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;

// --- Types ---

/// One stored user. Only `id` is unique; every other field is free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(deserialize_with = "required_text")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    /// [`UNSTAMPED`] until the store assigns a time to a record that had none.
    #[serde(default = "unstamped", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a record with a fresh UUID v4 and the current time.
    pub fn new(new: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            city: new.city,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive name comparison used by every by-name lookup.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct NewUser {
    /// Display name, e.g. "John"
    pub name: String,
    /// Email address (not validated)
    pub email: String,
    /// Phone number (not validated)
    #[serde(default)]
    pub phone: String,
    /// City
    #[serde(default)]
    pub city: String,
}

/// Shallow field merge for `UserStore::update`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct UserPatch {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.city.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }
        if let Some(city) = &self.city {
            user.city = city.clone();
        }
    }
}

/// Placeholder shown for empty optional fields.
pub fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Marks a record read without `created_at`.
pub const UNSTAMPED: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

fn unstamped() -> DateTime<Utc> {
    UNSTAMPED
}

/// Hand-edited files may hold numbers or booleans where text is expected.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(de)?).unwrap_or_default())
}

fn required_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    scalar_text(Value::deserialize(de)?).ok_or_else(|| de::Error::custom("id must not be null"))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(de)? else {
        return Ok(UNSTAMPED);
    };
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Parse RFC 3339, falling back to a naive ISO-8601 timestamp read as UTC
/// (older hand-written files carry no offset).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

// --- Paths ---

/// Resolve the global config directory (~/.roster/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".roster")
}

/// Data file used when neither `--data` nor `ROSTER_DATA` is given.
pub fn default_data_file() -> PathBuf {
    PathBuf::from("users.json")
}

// --- AI Settings ---

pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

impl AiSettings {
    /// Overlay `GEMINI_API_KEY`, `ROSTER_AI_PROVIDER` and `ROSTER_AI_MODEL`.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = var("GEMINI_API_KEY") {
            self.api_key = key;
            if self.provider.is_empty() {
                self.provider = DEFAULT_PROVIDER.to_string();
            }
            if self.model.is_empty() {
                self.model = DEFAULT_MODEL.to_string();
            }
        }
        if let Some(provider) = var("ROSTER_AI_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("ROSTER_AI_MODEL") {
            self.model = model;
        }
        self
    }
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn read_settings() -> AiSettings {
    let path = settings_path();
    if !path.exists() {
        return AiSettings::default();
    }
    fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Settings file plus environment overlay; what the binaries run with.
pub fn load_settings() -> AiSettings {
    read_settings().with_env()
}

pub fn write_settings(settings: &AiSettings) -> Result<(), String> {
    let dir = config_dir();
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(settings_path(), json).map_err(|e| e.to_string())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn reads_null_fields_and_naive_timestamp() {
        let raw = r#"{
            "id": "abc",
            "name": "John",
            "email": "john@x.com",
            "phone": null,
            "city": null,
            "created_at": "2024-05-01T10:20:30.123456"
        }"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.phone, "");
        assert_eq!(user.city, "");
        assert_eq!(user.created_at.year(), 2024);
        assert_eq!(user.created_at.hour(), 10);
    }

    #[test]
    fn scalar_fields_read_as_text() {
        let raw = r#"{"id": 7, "name": "Ana", "email": "ana@x.com", "phone": 5550100, "city": true}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.id, "7");
        assert_eq!(user.phone, "5550100");
        assert_eq!(user.city, "true");
        assert_eq!(user.created_at, UNSTAMPED);
    }

    #[test]
    fn null_id_is_rejected() {
        let raw = r#"{"id": null, "name": "Ana"}"#;
        assert!(serde_json::from_str::<User>(raw).is_err());
        assert!(serde_json::from_str::<User>(r#"{"name": "Ana"}"#).is_err());
    }

    #[test]
    fn naive_timestamp_without_fraction_parses() {
        let ts = parse_timestamp("2024-05-01T10:20:30").unwrap();
        assert_eq!(ts.second(), 30);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn writes_snake_case_keys() {
        let user = User::new(NewUser {
            name: "Ana".into(),
            email: "ana@x.com".into(),
            ..Default::default()
        });
        let v = serde_json::to_value(&user).unwrap();
        assert_eq!(v["name"], "Ana");
        assert!(v["created_at"].as_str().unwrap().ends_with('Z'));
        assert!(uuid::Uuid::parse_str(v["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let mut user = User::new(NewUser {
            name: "John".into(),
            email: "john@x.com".into(),
            phone: "123".into(),
            city: "Rome".into(),
        });
        let before = user.clone();
        let patch = UserPatch {
            city: Some("Milan".into()),
            ..Default::default()
        };
        patch.apply(&mut user);
        assert_eq!(user.city, "Milan");
        assert_eq!(user.name, before.name);
        assert_eq!(user.email, before.email);
        assert_eq!(user.phone, before.phone);
        assert_eq!(user.id, before.id);
        assert!(UserPatch::default().is_empty());
    }

    #[test]
    fn gemini_key_selects_google_provider() {
        let settings = AiSettings::default().with_vars(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(settings.provider, DEFAULT_PROVIDER);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert!(ai_configured(&settings));
    }

    #[test]
    fn ollama_needs_no_key() {
        let settings = AiSettings {
            provider: "ollama".into(),
            api_key: String::new(),
            model: "llama3".into(),
        };
        assert!(ai_configured(&settings));
        assert!(!ai_configured(&AiSettings::default()));
    }
}
