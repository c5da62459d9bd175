use crate::error::{LedgerError, Result};

/// Fixed tag closing every challenge message.
pub const CHALLENGE_TAG: &str = "starRegistry";

/// How long a challenge stays valid, in seconds. Inclusive.
pub const VALIDATION_WINDOW_SECS: i64 = 300;

/// The parts of a challenge message a submission needs to be checked
/// against. Nothing is stored between issuance and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge<'a> {
    pub address: &'a str,
    pub issued_at: i64,
}

impl<'a> Challenge<'a> {
    pub fn message(address: &str, issued_at: i64) -> String {
        format!("{}:{}:{}", address, issued_at, CHALLENGE_TAG)
    }

    pub fn parse(message: &'a str) -> Result<Self> {
        let parts: Vec<&str> = message.split(':').collect();
        let [address, issued_at, tag] = parts.as_slice() else {
            return Err(LedgerError::MalformedMessage(format!(
                "expected 3 colon-separated parts, got {}",
                parts.len()
            )));
        };

        if address.is_empty() {
            return Err(LedgerError::MalformedMessage("address part is empty".to_string()));
        }
        if *tag != CHALLENGE_TAG {
            return Err(LedgerError::MalformedMessage(format!(
                "unexpected tag '{}'",
                tag
            )));
        }
        if issued_at.is_empty() || !issued_at.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::MalformedMessage(format!(
                "timestamp '{}' is not a plain count of seconds",
                issued_at
            )));
        }
        let issued_at = issued_at.parse::<i64>().map_err(|e| {
            LedgerError::MalformedMessage(format!("invalid timestamp '{}': {}", issued_at, e))
        })?;

        Ok(Challenge {
            address: *address,
            issued_at,
        })
    }

    /// Cheap checks done before any signature work: the challenge must have
    /// been issued to `address`, not in the future, and within the window.
    pub fn check(&self, address: &str, now: i64) -> Result<()> {
        if !self.address.eq_ignore_ascii_case(address) {
            return Err(LedgerError::MalformedMessage(
                "challenge was issued to a different address".to_string(),
            ));
        }

        let elapsed = now.checked_sub(self.issued_at).ok_or_else(|| {
            LedgerError::MalformedMessage("challenge timestamp is out of range".to_string())
        })?;
        if elapsed < 0 {
            return Err(LedgerError::MalformedMessage(
                "challenge timestamp lies in the future".to_string(),
            ));
        }
        if elapsed > VALIDATION_WINDOW_SECS {
            return Err(LedgerError::ChallengeExpired {
                elapsed,
                window: VALIDATION_WINDOW_SECS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_round_trips_through_parse() {
        let message = Challenge::message("abc123", 1_700_000_000);
        assert_eq!(message, "abc123:1700000000:starRegistry");

        let challenge = Challenge::parse(&message).unwrap();
        assert_eq!(challenge.address, "abc123");
        assert_eq!(challenge.issued_at, 1_700_000_000);
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        for message in [
            "",
            "abc123:1700000000",
            "abc123:1700000000:starRegistry:extra",
            "abc123:soon:starRegistry",
            "abc123:1700000000:otherRegistry",
            ":1700000000:starRegistry",
            "abc123:-5:starRegistry",
            "abc123:+1700000000:starRegistry",
            "abc123: 1700000000:starRegistry",
            "abc123::starRegistry",
            "abc123:-9223372036854775808:starRegistry",
            "abc123:9223372036854775808:starRegistry",
        ] {
            assert!(
                matches!(Challenge::parse(message), Err(LedgerError::MalformedMessage(_))),
                "accepted {:?}",
                message
            );
        }
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let challenge = Challenge::parse("a:1000:starRegistry").unwrap();
        assert!(challenge.check("a", 1000).is_ok());
        assert!(challenge.check("a", 1300).is_ok());
        assert!(matches!(
            challenge.check("a", 1301),
            Err(LedgerError::ChallengeExpired { elapsed: 301, window: 300 })
        ));

        let latest = Challenge::parse("a:9223372036854775807:starRegistry").unwrap();
        assert!(matches!(latest.check("a", 1000), Err(LedgerError::MalformedMessage(_))));
        assert!(latest.check("a", i64::MAX).is_ok());

        let epoch = Challenge::parse("a:0:starRegistry").unwrap();
        assert!(epoch.check("a", 300).is_ok());
        assert!(matches!(epoch.check("a", 301), Err(LedgerError::ChallengeExpired { .. })));
    }

    #[test]
    fn test_check_never_overflows_on_extreme_timestamps() {
        let earliest = Challenge {
            address: "a",
            issued_at: i64::MIN,
        };
        assert!(matches!(earliest.check("a", 1000), Err(LedgerError::MalformedMessage(_))));
        assert!(matches!(earliest.check("a", i64::MAX), Err(LedgerError::MalformedMessage(_))));

        let latest = Challenge {
            address: "a",
            issued_at: i64::MAX,
        };
        assert!(matches!(latest.check("a", i64::MIN), Err(LedgerError::MalformedMessage(_))));
    }

    #[test]
    fn test_check_rejects_foreign_address_and_future_time() {
        let challenge = Challenge::parse("a:1000:starRegistry").unwrap();
        assert!(matches!(challenge.check("b", 1000), Err(LedgerError::MalformedMessage(_))));
        assert!(matches!(challenge.check("a", 999), Err(LedgerError::MalformedMessage(_))));
    }
}
