use std::time::Duration;

use futures::stream::{self, Stream};
use tokio::time;

/// Advisory wait display: yields `seconds`, then one less every second, ending at 0.
///
/// Purely cosmetic. Reaching 0 does not grant anything, the next submission is
/// checked against the rate window again.
pub fn countdown(seconds: u64) -> impl Stream<Item = u64> {
    let interval = time::interval(Duration::from_secs(1));
    stream::unfold((interval, Some(seconds)), |(mut interval, next)| async move {
        let remaining = next?;
        interval.tick().await;
        Some((remaining, (interval, remaining.checked_sub(1))))
    })
}
