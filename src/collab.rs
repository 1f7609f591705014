//! Interfaces to the opaque external collaborators: the managed record
//! store and the authentication service. Only the seams the gateway
//! core touches are modeled; the implementations live elsewhere.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{merge_and_sort, AppointmentCache, CachedAppointment, MERGE_LIMIT};
use crate::error::GatewayError;

/// Managed persistence: inserts always name a table, reads are keyed
/// by account identity and subject to a row-level access policy that
/// may return fewer rows than were inserted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError>;

    /// Most recent appointment rows visible to `user_id`, newest first,
    /// at most `limit`.
    async fn select_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CachedAppointment>, GatewayError>;
}

/// Session/profile fields attached at sign-up.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Authenticated account as the auth service reports it.
#[derive(Debug, Clone)]
pub struct AccountSession {
    pub user_id: String,
    pub email: String,
}

/// Opaque authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountSession, GatewayError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: ProfileFields,
    ) -> Result<AccountSession, GatewayError>;
    async fn sign_out(&self) -> Result<(), GatewayError>;
    async fn reset_password(&self, email: &str) -> Result<(), GatewayError>;
}

/// Appointments for the dashboard: the store's view merged with the
/// local cache. A denied or failed read degrades to cache-only rather
/// than surfacing an error, since the access policy legitimately hides
/// rows from their own submitter.
pub async fn fetch_appointments(
    store: &dyn RecordStore,
    cache: &AppointmentCache,
    user_id: &str,
) -> Vec<CachedAppointment> {
    let remote = match store.select_recent(user_id, MERGE_LIMIT).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::debug!(%err, "record store read failed, serving cache only");
            Vec::new()
        }
    };
    merge_and_sort(remote, cache.list(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NewAppointment;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    struct FixedStore(Result<Vec<CachedAppointment>, GatewayError>);

    #[async_trait]
    impl RecordStore for FixedStore {
        async fn insert(&self, _table: &str, _record: Value) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn select_recent(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> Result<Vec<CachedAppointment>, GatewayError> {
            self.0.clone()
        }
    }

    fn temp_cache() -> AppointmentCache {
        AppointmentCache::new(std::env::temp_dir().join(format!("vetgate-test-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn merges_remote_and_cached_rows() {
        let cache = temp_cache();
        cache.add(
            "u",
            NewAppointment {
                full_name: "cached".into(),
                created_at: Some(Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap()),
                ..NewAppointment::default()
            },
        );
        let remote = CachedAppointment {
            id: "r1".into(),
            full_name: "remote".into(),
            contact_phone: String::new(),
            department: String::new(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
            notes: None,
            owner_name: None,
            pet_name: None,
            pet_details: None,
        };
        let store = FixedStore(Ok(vec![remote]));

        let rows = fetch_appointments(&store, &cache, "u").await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name, "cached"); // newer
    }

    #[tokio::test]
    async fn denied_read_degrades_to_cache_only() {
        let cache = temp_cache();
        cache.add("u", NewAppointment::default());
        let store = FixedStore(Err(GatewayError::Http {
            status: 403,
            detail: "row-level policy".into(),
        }));

        let rows = fetch_appointments(&store, &cache, "u").await;
        assert_eq!(rows.len(), 1);
    }
}
