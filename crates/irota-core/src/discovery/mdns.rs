// ── Passive mDNS discovery ──
//
// Browses one service type for a fixed window and collects the addresses
// of instances whose name contains the device prefix. The mdns-sd daemon
// delivers events on a blocking channel, so the listen loop runs on the
// blocking pool.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::{debug, trace};

use crate::error::CoreError;

/// Listen for `window` and return matching addresses.
pub(crate) async fn browse(
    service: &str,
    prefix: &str,
    window: Duration,
) -> Result<BTreeSet<IpAddr>, CoreError> {
    let service = service.to_owned();
    let prefix = prefix.to_lowercase();

    tokio::task::spawn_blocking(move || listen(&service, &prefix, window))
        .await
        .map_err(|e| CoreError::Internal(format!("mDNS listener panicked: {e}")))?
}

fn listen(service: &str, prefix: &str, window: Duration) -> Result<BTreeSet<IpAddr>, CoreError> {
    let daemon = ServiceDaemon::new().map_err(mdns_error)?;
    let receiver = daemon.browse(service).map_err(mdns_error)?;
    debug!(service, "mDNS browse started");

    let deadline = Instant::now() + window;
    let mut found = BTreeSet::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        // Timeout means the window closed; an error means the daemon stopped.
        let Ok(event) = receiver.recv_timeout(remaining) else {
            break;
        };

        match event {
            ServiceEvent::ServiceResolved(info) => {
                let name = info.get_fullname();
                if !name.to_lowercase().contains(prefix) {
                    trace!(name, "ignoring mDNS service");
                    continue;
                }
                for addr in info.get_addresses() {
                    let ip = IpAddr::from(*addr);
                    debug!(name, %ip, "mDNS device advertisement");
                    found.insert(ip);
                }
            }
            other => trace!(?other, "mDNS event"),
        }
    }

    let _ = daemon.stop_browse(service);
    let _ = daemon.shutdown();
    debug!(service, count = found.len(), "mDNS browse finished");
    Ok(found)
}

fn mdns_error(e: mdns_sd::Error) -> CoreError {
    CoreError::ConnectionFailed {
        url: "mdns".into(),
        reason: e.to_string(),
    }
}
