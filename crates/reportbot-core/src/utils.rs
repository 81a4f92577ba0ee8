use std::{future::Future, time::Duration};

use chrono::Utc;

use crate::{errors::Error, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs and persisted metadata).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== External Call Helpers ==============

/// Bound an external call; an elapsed deadline becomes `Error::Timeout`.
pub async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::Timeout(limit)),
    }
}

/// Cut `text` to at most `max_chars` characters, ending the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Shorten user text for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let res: Result<()> = with_timeout(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(Error::Timeout(d)) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let res = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("héllo wörld", 5), "héllo…");
        assert_eq!(preview("a\nb", 10), "a b");
    }

    #[test]
    fn truncation_stays_within_the_limit() {
        assert_eq!(truncate_chars("hello", 5), "hello");
        let cut = truncate_chars("abcdefghij", 5);
        assert_eq!(cut, "abcd…");
        assert_eq!(cut.chars().count(), 5);
    }
}
