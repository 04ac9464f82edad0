use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chain_store::GuildId;

/// One mutex per guild.
///
/// Every load–mutate–persist sequence on a guild's documents runs inside
/// [`GuildLocks::with`], so two updates to the same guild never interleave
/// while different guilds proceed in parallel.
#[derive(Debug, Default)]
pub struct GuildLocks {
    locks: Mutex<HashMap<GuildId, Arc<Mutex<()>>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the guild's lock.
    pub fn with<T>(&self, guild: GuildId, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(guild).or_default())
        };
        // The guarded value is `()`, so a poisoned lock carries no torn state.
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_guild_is_serialized() {
        let locks = Arc::new(GuildLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with(GuildId(1), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn returns_closure_value() {
        let locks = GuildLocks::new();
        assert_eq!(locks.with(GuildId(3), || 41 + 1), 42);
    }
}
