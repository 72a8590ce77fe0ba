use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

pub fn elapsed_seconds(start: i64, end: i64) -> i64 {
    end - start
}

/// True once more than `timeout` seconds separate `timestamp` from `current_time`
pub fn is_expired(timestamp: i64, timeout: i64, current_time: i64) -> bool {
    elapsed_seconds(timestamp, current_time) > timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        // Should be a reasonable timestamp (after 2020-01-01)
        assert!(ts > 1577836800);
        // Should be before 2100-01-01
        assert!(ts < 4102444800);
    }

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(100, 150), 50);
        assert_eq!(elapsed_seconds(1000, 1000), 0);
        assert_eq!(elapsed_seconds(200, 100), -100);
    }

    #[test]
    fn test_is_expired() {
        let current = 1000;

        assert!(!is_expired(950, 100, current));
        assert!(is_expired(800, 100, current));

        // Edge case: exactly at timeout
        assert!(!is_expired(900, 100, current));
        assert!(is_expired(899, 100, current));
    }

    #[test]
    fn test_is_expired_session_ttl() {
        let session_ttl = 28_800;
        let current_time = current_timestamp();

        // Created an hour ago - still valid
        assert!(!is_expired(current_time - 3600, session_ttl, current_time));

        // Created yesterday - expired
        assert!(is_expired(current_time - 86_400, session_ttl, current_time));
    }
}
