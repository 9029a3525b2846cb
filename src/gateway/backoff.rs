use rand::Rng;
use std::time::Duration;

/// Seconds to wait before reconnect attempt number `attempts`.
///
/// The curve is `floor(2x - 4x / (ln x + 2))` for `x >= 1`, clamped at
/// zero because the raw formula dips negative for small attempt counts.
/// The first-ever attempt (`x = 0`) reconnects immediately.
pub fn delay(attempts: u32) -> Duration {
    if attempts == 0 {
        return Duration::ZERO;
    }
    let x = f64::from(attempts);
    let raw = (2.0 * x - 4.0 * x / (x.ln() + 2.0)).floor();
    Duration::from_secs(raw.max(0.0) as u64)
}

/// A RESUME is only worth attempting when the last disconnect left the
/// session replayable and a session id was ever captured. Anything else
/// means a fresh IDENTIFY.
pub fn should_resume(last_disconnect_resumable: bool, has_session_id: bool) -> bool {
    last_disconnect_resumable && has_session_id
}

/// Short randomized pause after INVALID_SESSION, so the client does not
/// hammer the server into invalidating the session again.
pub fn invalid_session_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000))
}
