//! Implements NotifierPort by logging the toast. Hosts with a real UI plug in their own.

use crate::ports::{ConnectivityNotice, NotifierPort};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToast;

impl NotifierPort for TracingToast {
    fn notify(&self, notice: ConnectivityNotice) {
        match notice {
            ConnectivityNotice::WentOffline => {
                warn!(toast = "offline", "أنت غير متصل بالإنترنت")
            }
            ConnectivityNotice::BackOnline => info!(toast = "online", "تم استعادة الاتصال"),
        }
    }
}
