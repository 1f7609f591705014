//! Local appointment cache.
//!
//! The record store's row-level access policy may hide rows from the
//! account that inserted them, so every successful submission is also
//! appended to a local per-account cache and merged back into reads.
//! The cache is strictly best-effort: writes swallow their failures
//! and an unreadable or corrupt file reads as empty.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reads keep at most this many records after the merge.
pub const MERGE_LIMIT: usize = 50;

/// One cached appointment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAppointment {
    pub id: String,
    pub full_name: String,
    pub contact_phone: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_details: Option<String>,
}

/// Submission fields as entered; id and timestamp are filled in by
/// [`AppointmentCache::add`].
#[derive(Debug, Clone, Default)]
pub struct NewAppointment {
    pub full_name: String,
    pub contact_phone: String,
    pub department: String,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub owner_name: Option<String>,
    pub pet_name: Option<String>,
    pub pet_details: Option<String>,
}

/// File-per-account JSON cache rooted at a configurable directory.
#[derive(Debug, Clone)]
pub struct AppointmentCache {
    dir: PathBuf,
}

impl AppointmentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache rooted at `VETGATE_CACHE_DIR`, or `vetgate-cache` under
    /// the system temp directory when unset.
    pub fn from_env() -> Self {
        match crate::util::non_empty_env("VETGATE_CACHE_DIR") {
            Some(dir) => Self::new(dir),
            None => Self::new(std::env::temp_dir().join("vetgate-cache")),
        }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        // Account ids are UUIDs in practice; strip anything that could
        // escape the cache directory regardless.
        let safe: String = user_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("appointments_{safe}.json"))
    }

    /// Cached records for one account, newest insertion first. Missing
    /// or unparseable files read as empty.
    pub fn list(&self, user_id: &str) -> Vec<CachedAppointment> {
        read_records(&self.path_for(user_id))
    }

    /// Prepend one record and persist. Failures are logged and
    /// swallowed; the submission already succeeded remotely and a cache
    /// miss only degrades the dashboard view.
    pub fn add(&self, user_id: &str, appointment: NewAppointment) -> CachedAppointment {
        let entry = CachedAppointment {
            id: Uuid::new_v4().to_string(),
            created_at: appointment.created_at.unwrap_or_else(Utc::now),
            owner_name: appointment
                .owner_name
                .or_else(|| Some(appointment.full_name.clone())),
            full_name: appointment.full_name,
            contact_phone: appointment.contact_phone,
            department: appointment.department,
            notes: appointment.notes,
            pet_name: appointment.pet_name,
            pet_details: appointment.pet_details,
        };

        let path = self.path_for(user_id);
        let mut list = read_records(&path);
        list.insert(0, entry.clone());
        if let Err(err) = write_records(&path, &list) {
            tracing::warn!(%err, path = %path.display(), "appointment cache write failed");
        }
        entry
    }
}

fn read_records(path: &Path) -> Vec<CachedAppointment> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

fn write_records(path: &Path, records: &[CachedAppointment]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec(records).map_err(std::io::Error::other)?;
    fs::write(path, body)
}

/// Union of remote and cached records: deduplicate on the
/// `(created_at, full_name, contact_phone)` composite (remote wins),
/// sort newest first, keep at most [`MERGE_LIMIT`].
pub fn merge_and_sort(
    remote: Vec<CachedAppointment>,
    cached: Vec<CachedAppointment>,
) -> Vec<CachedAppointment> {
    let mut seen = std::collections::HashSet::new();
    let mut combined = Vec::with_capacity(remote.len() + cached.len());
    for record in remote.into_iter().chain(cached) {
        let key = format!(
            "{}|{}|{}",
            record.created_at.to_rfc3339(),
            record.full_name,
            record.contact_phone
        );
        if seen.insert(key) {
            combined.push(record);
        }
    }
    combined.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    combined.truncate(MERGE_LIMIT);
    combined
}
