//! Response freshness check
//!
//! `producedAt` is accepted when it lies in
//! `[now - (skew + lifetime), now + skew]`, both ends inclusive.

use crate::error::{OcspError, ValidationFailure};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Upper bound for any configured window (100 years), keeps the
/// `DateTime` arithmetic below in range
const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn window(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}

/// Reject responses produced too long ago or too far in the future
pub fn check_produced_at(
    produced_at: DateTime<Utc>,
    accepted_clock_skew_secs: u64,
    response_lifetime_secs: u64,
    now: DateTime<Utc>,
) -> Result<(), OcspError> {
    let skew = window(accepted_clock_skew_secs);
    let lifetime = window(response_lifetime_secs);

    let oldest_accepted = now
        .checked_sub_signed(skew + lifetime)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let latest_accepted = now
        .checked_add_signed(skew)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    debug!(
        %produced_at,
        %oldest_accepted,
        %latest_accepted,
        "Checking OCSP response freshness"
    );

    if produced_at < oldest_accepted {
        return Err(ValidationFailure::Stale {
            produced_at,
            oldest_accepted,
        }
        .into());
    }

    if produced_at > latest_accepted {
        return Err(ValidationFailure::FutureDated {
            produced_at,
            latest_accepted,
        }
        .into());
    }

    Ok(())
}
