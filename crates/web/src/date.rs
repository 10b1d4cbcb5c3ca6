//! The `Date` response header.
//!
//! Formatting an HTTP date on every response is wasteful when the value only changes once
//! a second, so [`DateService`] keeps the formatted value and refreshes it from a
//! background task.

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;

const UPDATE_INTERVAL: Duration = Duration::from_millis(800);

/// Holds the current HTTP date, refreshed in the background while the service lives.
pub(crate) struct DateService {
    current: Arc<ArcSwap<Bytes>>,
    handle: tokio::task::JoinHandle<()>,
}

fn now() -> Bytes {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Bytes::from_owner(buf)
}

impl DateService {
    /// Starts the refresh task; must be called from within a tokio runtime.
    pub(crate) fn new() -> Self {
        Self::with_update_interval(UPDATE_INTERVAL)
    }

    fn with_update_interval(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(now()));
        let current_arc = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(update_interval).await;
                current_arc.store(Arc::new(now()));
            }
        });

        DateService { current, handle }
    }

    pub(crate) fn http_date(&self) -> HeaderValue {
        let date = self.current.load().as_ref().clone();
        // SAFETY: faf_http_date writes an IMF-fixdate, which is visible ASCII only
        unsafe { HeaderValue::from_maybe_shared_unchecked(date) }
    }
}

impl Drop for DateService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
