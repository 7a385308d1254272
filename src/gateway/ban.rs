use std::time::{Duration, Instant};

use ahash::AHashMap;
use tokio::sync::Mutex;

use crate::fingerprint::ClientFingerprint;

struct BanEntry {
    banned_until: Instant,
    risk_at_ban: f32,
}

/// Time-bounded deny-list keyed by client fingerprint.
///
/// Bans are fixed-duration and reset on each new offense; there is no
/// allow-list, no permanent ban, and no progressive backoff. Expired
/// entries are evicted lazily on lookup, which is the only reclamation
/// path.
pub struct BanLedger {
    entries: Mutex<AHashMap<ClientFingerprint, BanEntry>>,
}

impl BanLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        BanLedger {
            entries: Mutex::new(AHashMap::new()),
        }
    }

    /// Bans `fingerprint` for `duration` starting now, overwriting any
    /// existing entry. `risk_at_ban` records the score that earned the ban.
    pub async fn ban(&self, fingerprint: ClientFingerprint, duration: Duration, risk_at_ban: f32) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            fingerprint,
            BanEntry {
                banned_until: Instant::now() + duration,
                risk_at_ban,
            },
        );
    }

    /// Whether `fingerprint` is currently banned. An entry whose deadline
    /// has passed is removed and reported as not banned.
    pub async fn is_banned(&self, fingerprint: ClientFingerprint) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(&fingerprint) {
            Some(entry) if Instant::now() > entry.banned_until => {
                entries.remove(&fingerprint);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// The score recorded when `fingerprint` was banned, if it still has a
    /// live entry. Expired entries are evicted here too.
    pub async fn risk_at_ban(&self, fingerprint: ClientFingerprint) -> Option<f32> {
        let mut entries = self.entries.lock().await;
        match entries.get(&fingerprint) {
            Some(entry) if Instant::now() > entry.banned_until => {
                entries.remove(&fingerprint);
                None
            }
            Some(entry) => Some(entry.risk_at_ban),
            None => None,
        }
    }
}

impl Default for BanLedger {
    fn default() -> Self {
        Self::new()
    }
}
