//! Job records and the shared status store polled by clients.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How long terminal entries are retained before eviction.
pub const TERMINAL_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Success,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// One end-to-end video request. Serialized as the polling payload, so the
/// result path surfaces under the wire name `video_path`.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "video_path", skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
}

/// Process-wide job map. One worker owns each id; the map itself is
/// mutex-guarded for cross-id inserts and lookups. Terminal entries are
/// evicted after `TERMINAL_TTL` so the map stays bounded.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<Mutex<HashMap<String, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh processing record, evicting expired terminal
    /// entries while the lock is held.
    pub fn create(&self, id: &str, message: &str) -> Job {
        let job = Job {
            id: id.to_string(),
            status: JobStatus::Processing,
            message: message.to_string(),
            created_at: Utc::now(),
            result_path: None,
        };

        let mut map = self.lock();
        evict_expired(&mut map, Utc::now());
        map.insert(id.to_string(), job.clone());
        job
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Move a job to a terminal status. A job's status is monotonic:
    /// attempts to transition an already-terminal job are ignored.
    /// Returns whether the transition was applied.
    pub fn complete(
        &self,
        id: &str,
        status: JobStatus,
        message: &str,
        result_path: Option<PathBuf>,
    ) -> bool {
        debug_assert!(status.is_terminal());

        let mut map = self.lock();
        let Some(job) = map.get_mut(id) else {
            warn!(job_id = id, "completion for unknown job");
            return false;
        };
        if job.status.is_terminal() {
            warn!(job_id = id, "ignoring second terminal transition");
            return false;
        }

        job.status = status;
        job.message = message.to_string();
        job.result_path = result_path;
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        // A panic while holding the lock leaves plain data behind;
        // recover the map rather than poisoning every future request.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, by: Duration) {
        let mut map = self.lock();
        if let Some(job) = map.get_mut(id) {
            job.created_at = job.created_at - chrono::TimeDelta::from_std(by).unwrap();
        }
    }
}

fn evict_expired(map: &mut HashMap<String, Job>, now: DateTime<Utc>) {
    let ttl = chrono::TimeDelta::from_std(TERMINAL_TTL).expect("constant fits");
    let before = map.len();
    map.retain(|_, job| !job.status.is_terminal() || now - job.created_at < ttl);
    let evicted = before - map.len();
    if evicted > 0 {
        debug!(evicted, "evicted expired terminal jobs");
    }
}
