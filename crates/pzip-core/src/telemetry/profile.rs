//! Fine-grained timing events for the `pzip.profile` tracing target.
//!
//! Events are only built with the `profiling` feature. `PZIP_PROFILE_TAGS`
//! selects subsystems by name (`codec,writer`); `all`, `*`, `system` or an
//! empty value select every subsystem.

use std::time::Instant;

use super::Subsystem;

/// Microseconds since `started_at`, clamped to `u64::MAX`.
#[inline]
pub fn elapsed_us(started_at: Instant) -> u64 {
    crate::types::duration_to_us(started_at.elapsed())
}

#[cfg(feature = "profiling")]
mod filter {
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::Subsystem;

    const PROFILE_TAGS_ENV: &str = "PZIP_PROFILE_TAGS";
    const ALL: u8 = (1 << Subsystem::ALL.len()) - 1;

    fn bit(subsystem: Subsystem) -> u8 {
        1 << subsystem as u8
    }

    pub(super) fn parse(raw: &str) -> u8 {
        let mut mask = 0u8;
        for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            let token = token.to_ascii_lowercase();
            if matches!(token.as_str(), "*" | "all" | "system") {
                return ALL;
            }
            if let Some(subsystem) = Subsystem::ALL
                .into_iter()
                .find(|subsystem| subsystem.as_str() == token)
            {
                mask |= bit(subsystem);
            }
        }
        if mask == 0 { ALL } else { mask }
    }

    fn mask() -> &'static AtomicU8 {
        static MASK: OnceLock<AtomicU8> = OnceLock::new();
        MASK.get_or_init(|| AtomicU8::new(from_env()))
    }

    pub(super) fn from_env() -> u8 {
        std::env::var(PROFILE_TAGS_ENV)
            .map(|raw| parse(&raw))
            .unwrap_or(ALL)
    }

    pub(super) fn store(value: u8) {
        mask().store(value, Ordering::Relaxed);
    }

    pub(super) fn store_subsystems(subsystems: &[Subsystem]) {
        let value = subsystems.iter().fold(0, |mask, &subsystem| mask | bit(subsystem));
        store(if value == 0 { ALL } else { value });
    }

    pub(super) fn contains(subsystem: Subsystem) -> bool {
        mask().load(Ordering::Relaxed) & bit(subsystem) != 0
    }
}

/// Restricts profiling events to `subsystems`; an empty slice enables all.
pub fn set_enabled_subsystems(subsystems: &[Subsystem]) {
    #[cfg(feature = "profiling")]
    filter::store_subsystems(subsystems);

    let _ = subsystems;
}

/// Re-reads `PZIP_PROFILE_TAGS`.
pub fn reload_enabled_tags_from_env() {
    #[cfg(feature = "profiling")]
    filter::store(filter::from_env());
}

/// True when events for `subsystem` are emitted.
pub fn is_enabled(subsystem: Subsystem) -> bool {
    #[cfg(feature = "profiling")]
    {
        return filter::contains(subsystem);
    }

    #[cfg(not(feature = "profiling"))]
    {
        let _ = subsystem;
        false
    }
}

/// Emits one timing event for `subsystem` when it is enabled.
#[inline]
pub fn event(
    subsystem: Subsystem,
    op: &'static str,
    result: &'static str,
    elapsed_us: u64,
    message: &'static str,
) {
    #[cfg(feature = "profiling")]
    if filter::contains(subsystem) {
        tracing::debug!(
            target: "pzip.profile",
            subsystem = subsystem.as_str(),
            op,
            result,
            elapsed_us,
            "{message}"
        );
    }

    let _ = (subsystem, op, result, elapsed_us, message);
}
