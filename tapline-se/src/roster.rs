//! In-process roster cache
//!
//! Read-only projection of the per-site student and staff rosters, loaded
//! from the database and refreshed by a background task. The resolver reads
//! snapshots; nothing in the scan pipeline writes roster rows.
//!
//! Readers can fire before the cache is warm, so each site tracks a loaded
//! flag the resolver polls against (bounded, see resolver).

use crate::db;
use crate::error::Result;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tapline_common::person::{StaffRecord, StudentRecord};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Roster snapshot for one site
#[derive(Debug, Clone, Default)]
pub struct SiteRoster {
    pub students: Vec<StudentRecord>,
    pub staff: Vec<StaffRecord>,
}

/// Shared roster cache keyed by site
#[derive(Clone)]
pub struct RosterCache {
    sites: Arc<RwLock<HashMap<String, SiteRoster>>>,
}

impl RosterCache {
    pub fn new() -> Self {
        Self {
            sites: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether a roster has been loaded for `site_id`
    pub async fn is_loaded(&self, site_id: &str) -> bool {
        self.sites.read().await.contains_key(site_id)
    }

    /// Cloned snapshot for `site_id`, if loaded
    pub async fn snapshot(&self, site_id: &str) -> Option<SiteRoster> {
        self.sites.read().await.get(site_id).cloned()
    }

    /// Replace one site's roster (used by the refresher and by tests)
    pub async fn replace_site(&self, site_id: &str, roster: SiteRoster) {
        let mut sites = self.sites.write().await;
        sites.insert(site_id.to_string(), roster);
    }

    /// Reload one site's roster from the database
    pub async fn refresh_site(&self, pool: &Pool<Sqlite>, site_id: &str) -> Result<()> {
        let students = db::roster::load_students(pool, site_id).await?;
        let staff = db::roster::load_staff(pool, site_id).await?;

        debug!(
            "Loaded roster for {}: {} students, {} staff",
            site_id,
            students.len(),
            staff.len()
        );

        self.replace_site(site_id, SiteRoster { students, staff }).await;
        Ok(())
    }

    /// Reload every site present in the roster tables
    pub async fn refresh_all(&self, pool: &Pool<Sqlite>) -> Result<()> {
        for site_id in db::roster::list_site_ids(pool).await? {
            self.refresh_site(pool, &site_id).await?;
        }
        Ok(())
    }
}

impl Default for RosterCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the periodic roster refresh task
///
/// A refresh failure is logged and retried at the next tick; the cache keeps
/// serving the previous snapshot in the meantime.
pub fn spawn_refresher(
    cache: RosterCache,
    pool: Pool<Sqlite>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = cache.refresh_all(&pool).await {
                warn!("Roster refresh failed: {}", e);
            }
        }
    })
}
