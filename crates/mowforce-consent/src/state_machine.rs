//! Banner visibility policy. Pure; no I/O.

use chrono::{DateTime, Duration, Utc};

use crate::types::{BannerVisibility, ConsentRecord};

/// Outcome of evaluating a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub banner: BannerVisibility,
    /// The record still in force, or `None` if the visitor is undecided.
    pub effective_record: Option<ConsentRecord>,
}

impl Decision {
    fn undecided() -> Self {
        Self {
            banner: BannerVisibility::Visible,
            effective_record: None,
        }
    }

    fn decided(record: &ConsentRecord) -> Self {
        Self {
            banner: BannerVisibility::Hidden,
            effective_record: Some(record.clone()),
        }
    }
}

/// Decide banner visibility for `record` at `now`.
///
/// Absent or expired records re-prompt. Any unexpired record, including an
/// explicit decline of both categories, hides the banner.
pub fn decide(
    record: Option<&ConsentRecord>,
    now: DateTime<Utc>,
    expiry_window: Duration,
) -> Decision {
    let Some(record) = record else {
        return Decision::undecided();
    };

    if now - record.consented_at > expiry_window {
        return Decision::undecided();
    }

    // A decline is a decision too; it does not re-prompt until expiry.
    Decision::decided(record)
}

/// [`decide`] bound to a fixed expiry window.
#[derive(Debug, Clone, Copy)]
pub struct ConsentStateMachine {
    expiry_window: Duration,
}

impl ConsentStateMachine {
    pub fn new(expiry_window: Duration) -> Self {
        Self { expiry_window }
    }

    pub fn expiry_window(&self) -> Duration {
        self.expiry_window
    }

    pub fn decide(&self, record: Option<&ConsentRecord>, now: DateTime<Utc>) -> Decision {
        decide(record, now, self.expiry_window)
    }
}

impl Default for ConsentStateMachine {
    fn default() -> Self {
        Self::new(Duration::days(365))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year() -> Duration {
        Duration::days(365)
    }

    #[test]
    fn test_absent_record_shows_banner() {
        let d = decide(None, Utc::now(), year());
        assert_eq!(d.banner, BannerVisibility::Visible);
        assert!(d.effective_record.is_none());
    }

    #[test]
    fn test_fresh_grant_hides_banner() {
        let now = Utc::now();
        for (analytics, advertising) in [(true, false), (false, true), (true, true)] {
            let r = ConsentRecord::new(analytics, advertising, now - Duration::days(10));
            let d = decide(Some(&r), now, year());
            assert_eq!(d.banner, BannerVisibility::Hidden);
            assert_eq!(d.effective_record, Some(r));
        }
    }

    #[test]
    fn test_fresh_decline_hides_banner() {
        let now = Utc::now();
        let r = ConsentRecord::new(false, false, now - Duration::days(364));
        let d = decide(Some(&r), now, year());
        assert_eq!(d.banner, BannerVisibility::Hidden);
        assert_eq!(d.effective_record, Some(r));
    }

    #[test]
    fn test_expired_record_is_dropped_regardless_of_flags() {
        let now = Utc::now();
        for (analytics, advertising) in [(true, true), (false, false), (true, false)] {
            let r = ConsentRecord::new(analytics, advertising, now - Duration::days(400));
            let d = decide(Some(&r), now, year());
            assert_eq!(d.banner, BannerVisibility::Visible);
            assert!(d.effective_record.is_none());
        }
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let at_limit = ConsentRecord::new(true, true, now - year());
        assert_eq!(
            decide(Some(&at_limit), now, year()).banner,
            BannerVisibility::Hidden
        );

        let past_limit =
            ConsentRecord::new(true, true, now - year() - Duration::milliseconds(1));
        assert_eq!(
            decide(Some(&past_limit), now, year()).banner,
            BannerVisibility::Visible
        );
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let now = Utc::now();
        let r = ConsentRecord::new(true, false, now + Duration::days(3));
        assert_eq!(decide(Some(&r), now, year()).banner, BannerVisibility::Hidden);
    }

    #[test]
    fn test_compressed_window() {
        let machine = ConsentStateMachine::new(Duration::minutes(5));
        let now = Utc::now();
        let r = ConsentRecord::new(true, true, now - Duration::minutes(6));
        assert!(machine.decide(Some(&r), now).effective_record.is_none());
        assert_eq!(ConsentStateMachine::default().expiry_window(), year());
    }
}
