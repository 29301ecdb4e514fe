//! Candidate resolution: probe candidates in order until one is free.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ports::PortProber;

/// Return the first candidate the prober reports free.
///
/// Candidates are consumed in order, so earlier entries win. Busy and
/// failed probes both skip to the next candidate; there is no backoff.
pub async fn resolve<P, I>(prober: &P, candidates: I) -> Result<u16>
where
    P: PortProber,
    I: IntoIterator<Item = u16>,
{
    let mut tried = 0usize;
    for port in candidates {
        tried += 1;
        let probe = prober.probe(port).await;
        if probe.is_free() {
            debug!(port = port, tried = tried, "found free port");
            return Ok(port);
        }
        trace!(port = port, probe = %probe, "skipping candidate");
    }

    debug!(tried = tried, "candidates exhausted");
    Err(Error::NoFreePort)
}
