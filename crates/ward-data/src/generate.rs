//! Pure generators for test-data uniqueness (not for security)

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp, strictly increasing within the process
///
/// Two calls in the same millisecond still yield distinct values.
pub fn unique_stamp() -> u64 {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Random v4 UUID
pub fn generate_unique_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `<prefix>_<stamp>@example.com`
pub fn generate_test_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, unique_stamp())
}

/// Alphanumeric string of `length` characters
pub fn generate_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_unique_stamp_is_strictly_increasing() {
        let stamps: Vec<u64> = (0..1000).map(|_| unique_stamp()).collect();
        assert!(stamps.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_generate_test_email() {
        let a = generate_test_email("test");
        let b = generate_test_email("test");
        assert!(a.starts_with("test_"));
        assert!(a.ends_with("@example.com"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_random_string() {
        let s = generate_random_string(24);
        assert_eq!(s.len(), 24);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(generate_random_string(0), "");
    }

    #[test]
    fn test_generate_unique_id() {
        let ids: HashSet<String> = (0..100).map(|_| generate_unique_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
