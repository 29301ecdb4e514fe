//! Allocation registry: named port claims over a pool of candidate ports.
//!
//! # Scheduling
//! `claim` validates its arguments synchronously and hands the request to a
//! per-registry resolution task through a queue. The task probes and
//! registers claims one request at a time, in the order they were issued,
//! recomputing the available set when each request starts. Because the
//! handoff never resolves inside the calling frame, a listener subscribed
//! right after `claim` returns (before the caller yields) sees the outcome.
//! That only holds on a current-thread runtime, so `claim` refuses to run
//! on any other.
//!
//! # Best effort
//! Probing is check-then-act. Nothing is kept bound between the probe and
//! the service's own bind, so another process can still grab the port in
//! between; the registry only guarantees that no two of *its* claims share
//! a port.

use std::collections::BTreeSet;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::TcpProber;
use crate::config::RegistryConfig;
use crate::domain::{available, expand, Claim, EventKind, PortEvent, PortRange, Release, MAX_PORT};
use crate::error::{Error, Result};
use crate::ports::PortProber;

use super::notifier::{Notifier, SubscriptionId};
use super::resolver::resolve;
use super::watchdog::Watchdog;

// ============================================================================
// Views
// ============================================================================

/// Point-in-time view of the port pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortsSnapshot {
    /// Included ranges, in the order they were added. Holds the default
    /// range when nothing has been included.
    pub included: Vec<PortRange>,
    /// True when `included` is the default range rather than configured.
    pub defaulted: bool,
    /// Excluded ranges, in the order they were added.
    pub excluded: Vec<PortRange>,
    /// Included minus excluded minus claimed, ascending.
    pub available: Vec<u16>,
    /// Ports of current claims, in claim order.
    pub claimed: Vec<u16>,
}

impl PortsSnapshot {
    /// Every port covered by the included ranges.
    pub fn included_ports(&self) -> BTreeSet<u16> {
        expand(&self.included)
    }

    /// Every port covered by the excluded ranges.
    pub fn excluded_ports(&self) -> BTreeSet<u16> {
        expand(&self.excluded)
    }
}

// ============================================================================
// PendingClaim
// ============================================================================

/// The eventual result of a `claim` call.
///
/// Dropping it does not cancel the claim; the registry still resolves it
/// and emits the matching notification.
#[derive(Debug)]
pub struct PendingClaim {
    name: String,
    rx: oneshot::Receiver<Result<Claim>>,
}

impl PendingClaim {
    /// Name of the service being claimed.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Future for PendingClaim {
    type Output = Result<Claim>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or_else(|_| Err(Error::Closed)))
    }
}

// ============================================================================
// Registry
// ============================================================================

struct Entry {
    claim: Claim,
    /// Held for its `Drop`: removing the entry cancels the heartbeat.
    _watchdog: Option<Watchdog>,
}

#[derive(Default)]
struct State {
    included: Vec<PortRange>,
    excluded: Vec<PortRange>,
    entries: Vec<Entry>,
}

impl State {
    fn find(&self, name: &str) -> Option<&Claim> {
        self.entries.iter().map(|e| &e.claim).find(|c| c.name == name)
    }

    fn is_claimed(&self, port: u16) -> bool {
        self.entries.iter().any(|e| e.claim.port == port)
    }

    fn claimed(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|e| e.claim.port)
    }

    /// Ranges claims are drawn from: the included ranges, or the default.
    fn effective_included<'a>(&'a self, default_range: &'a PortRange) -> &'a [PortRange] {
        if self.included.is_empty() {
            std::slice::from_ref(default_range)
        } else {
            &self.included
        }
    }

    fn available(&self, default_range: &PortRange) -> Vec<u16> {
        available(
            self.effective_included(default_range),
            &self.excluded,
            self.claimed(),
        )
    }
}

struct ClaimRequest {
    name: String,
    preferred: Option<u16>,
    reply: oneshot::Sender<Result<Claim>>,
}

struct Inner<P> {
    prober: P,
    heartbeat: Option<Duration>,
    default_range: PortRange,
    state: RwLock<State>,
    notifier: Notifier,
    queue: Mutex<Option<mpsc::UnboundedSender<ClaimRequest>>>,
}

/// Tracks which named service holds which port.
///
/// Cloning is cheap and every clone shares the same claims. Dropping the
/// last clone cancels all heartbeats and fails pending claims with
/// `Error::Closed`.
pub struct PortRegistry<P: PortProber + 'static = TcpProber> {
    inner: Arc<Inner<P>>,
}

impl<P: PortProber + 'static> Clone for PortRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PortRegistry<TcpProber> {
    /// Create a registry probing with real TCP binds.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Self::with_prober(config, TcpProber::new())
    }
}

impl<P: PortProber + 'static> PortRegistry<P> {
    /// Create a registry with a custom prober.
    ///
    /// Fails with `InvalidHeartbeat` for a negative heartbeat.
    pub fn with_prober(config: RegistryConfig, prober: P) -> Result<Self> {
        let heartbeat = config.heartbeat()?;
        debug!(
            default_range = %config.default_range,
            heartbeat_ms = config.heartbeat_ms,
            "creating port registry"
        );

        let registry = Self {
            inner: Arc::new(Inner {
                prober,
                heartbeat,
                default_range: config.default_range,
                state: RwLock::new(State::default()),
                notifier: Notifier::new(),
                queue: Mutex::new(None),
            }),
        };

        for range in config.include {
            registry.include_range(range);
        }
        for range in config.exclude {
            registry.exclude_range(range);
        }

        Ok(registry)
    }

    /// Heartbeat period, if watchdogs are enabled.
    pub fn heartbeat(&self) -> Option<Duration> {
        self.inner.heartbeat
    }

    /// Range used for omitted bounds and when nothing is included.
    pub fn default_range(&self) -> PortRange {
        self.inner.default_range
    }

    // =========================================================================
    // Pool configuration
    // =========================================================================

    /// Include the given port or range of ports.
    ///
    /// Omitted bounds fall back to the default range. Nothing is recorded
    /// when validation fails.
    pub fn include(&self, from: Option<i64>, to: Option<i64>) -> Result<&Self> {
        let range = PortRange::normalize(from, to, self.inner.default_range)?;
        Ok(self.include_range(range))
    }

    /// Exclude the given port or range of ports.
    pub fn exclude(&self, from: Option<i64>, to: Option<i64>) -> Result<&Self> {
        let range = PortRange::normalize(from, to, self.inner.default_range)?;
        Ok(self.exclude_range(range))
    }

    /// Include an already validated range.
    pub fn include_range(&self, range: PortRange) -> &Self {
        self.inner.state.write().included.push(range);
        info!(from = range.start(), to = range.end(), "included ports");
        self
    }

    /// Exclude an already validated range.
    pub fn exclude_range(&self, range: PortRange) -> &Self {
        self.inner.state.write().excluded.push(range);
        info!(from = range.start(), to = range.end(), "excluded ports");
        self
    }

    // =========================================================================
    // Claims
    // =========================================================================

    /// Claim a port for `name`.
    ///
    /// With a preferred port, that port is the only candidate and range
    /// restrictions do not apply. Without one, the available set is tried
    /// in ascending order. Claiming a name that is already held resolves
    /// to the existing claim without probing.
    ///
    /// Argument errors are returned here; allocation failures arrive
    /// through the returned `PendingClaim` and the `Unavailable` event.
    /// A preferred port is kept with the request even when the name is
    /// held, so a release landing before resolution still honors it.
    ///
    /// Must be called on a current-thread tokio runtime; any other context
    /// fails with `Error::NoRuntime`.
    pub fn claim(&self, name: impl Into<String>, preferred: Option<i64>) -> Result<PendingClaim> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("claim requires a service name".to_string()));
        }

        let preferred = match preferred.map(validate_port).transpose() {
            Ok(port) => port,
            // A held name is answered from its claim; the port is never used.
            Err(_) if self.get(&name).is_some() => None,
            Err(e) => return Err(e),
        };

        let queue = self.queue()?;
        let (reply, rx) = oneshot::channel();
        debug!(name = %name, preferred = ?preferred, "queueing claim");
        queue
            .send(ClaimRequest {
                name: name.clone(),
                preferred,
                reply,
            })
            .map_err(|_| Error::Closed)?;

        Ok(PendingClaim { name, rx })
    }

    /// Release the claim identified by name, port or handle.
    ///
    /// Returns the released claim, or `None` when nothing matched (which is
    /// not an error). Cancels the claim's heartbeat and emits `Release`.
    pub fn release(&self, target: impl Into<Release>) -> Result<Option<Claim>> {
        let target = target.into();
        target.validate()?;
        Ok(self.inner.remove_where(|claim| target.matches(claim)))
    }

    /// Release every claim, emitting one `Release` per claim.
    pub fn release_all(&self) -> Vec<Claim> {
        let entries = std::mem::take(&mut self.inner.state.write().entries);
        let claims: Vec<Claim> = entries.iter().map(|e| e.claim.clone()).collect();
        // Cancel all heartbeats before anyone hears about the releases.
        drop(entries);

        for claim in &claims {
            debug!(name = %claim.name, port = claim.port, "released");
            self.inner.notifier.emit(&PortEvent::Release(claim.clone()));
        }
        claims
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Snapshot of included, excluded, available and claimed ports.
    pub fn ports(&self) -> PortsSnapshot {
        let state = self.inner.state.read();
        PortsSnapshot {
            included: state.effective_included(&self.inner.default_range).to_vec(),
            defaulted: state.included.is_empty(),
            excluded: state.excluded.clone(),
            available: state.available(&self.inner.default_range),
            claimed: state.claimed().collect(),
        }
    }

    /// Current claims, in claim order.
    pub fn services(&self) -> Vec<Claim> {
        self.inner
            .state
            .read()
            .entries
            .iter()
            .map(|e| e.claim.clone())
            .collect()
    }

    /// The claim held by `name`, if any.
    pub fn get(&self, name: &str) -> Option<Claim> {
        self.inner.state.read().find(name).cloned()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Subscribe to one kind of event.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PortEvent) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(kind, listener)
    }

    /// Subscribe to every event.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PortEvent) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe_all(listener)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    /// Sender half of the resolution queue, starting the task on first use.
    fn queue(&self) -> Result<mpsc::UnboundedSender<ClaimRequest>> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(Error::NoRuntime);
        }

        let mut queue = self.inner.queue.lock();
        if let Some(tx) = queue.as_ref().filter(|tx| !tx.is_closed()) {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(drive(Arc::downgrade(&self.inner), rx));
        *queue = Some(tx.clone());
        Ok(tx)
    }
}

fn validate_port(port: i64) -> Result<u16> {
    if port <= 0 || port > i64::from(MAX_PORT) {
        return Err(Error::InvalidPort(port));
    }
    Ok(port as u16)
}

/// Resolution task: one claim request at a time, in issue order.
async fn drive<P: PortProber + 'static>(
    inner: Weak<Inner<P>>,
    mut rx: mpsc::UnboundedReceiver<ClaimRequest>,
) {
    while let Some(request) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let result = inner.process(&request.name, request.preferred).await;
        // The caller may have dropped its PendingClaim; the claim stands regardless.
        let _ = request.reply.send(result);
    }
    debug!("claim queue closed");
}

impl<P: PortProber + 'static> Inner<P> {
    async fn process(self: &Arc<Self>, name: &str, preferred: Option<u16>) -> Result<Claim> {
        let existing = self.state.read().find(name).cloned();
        if let Some(existing) = existing {
            debug!(name = %name, port = existing.port, "service already registered");
            self.notifier.emit(&PortEvent::Claim(existing.clone()));
            return Ok(existing);
        }

        let candidates = {
            let state = self.state.read();
            match preferred {
                Some(port) if state.is_claimed(port) => Vec::new(),
                Some(port) => vec![port],
                None => state.available(&self.default_range),
            }
        };
        debug!(name = %name, candidates = candidates.len(), "probing candidates");

        match resolve(&self.prober, candidates).await {
            Ok(port) => {
                let claim = Claim::new(
                    name,
                    port,
                    self.heartbeat.map(|period| period.as_millis() as u64),
                );
                let watchdog = self
                    .heartbeat
                    .map(|period| self.start_watchdog(&claim, period));
                self.state.write().entries.push(Entry {
                    claim: claim.clone(),
                    _watchdog: watchdog,
                });

                info!(name = %claim.name, port = claim.port, "claimed port");
                self.notifier.emit(&PortEvent::Claim(claim.clone()));
                Ok(claim)
            }
            Err(e) => {
                warn!(name = %name, preferred = ?preferred, error = %e, "no port claimed");
                self.notifier.emit(&PortEvent::Unavailable {
                    name: name.to_string(),
                    port: preferred,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Re-probe the claimed port every period; a free port means the claim
    /// is no longer actually held, so release it.
    fn start_watchdog(self: &Arc<Self>, claim: &Claim, period: Duration) -> Watchdog {
        let registry = Arc::downgrade(self);
        let id: Uuid = claim.id;
        let port = claim.port;

        Watchdog::start(port, period, move || {
            let registry = registry.clone();
            async move {
                let Some(inner) = registry.upgrade() else {
                    return ControlFlow::Break(());
                };
                if !inner.prober.probe(port).await.is_free() {
                    return ControlFlow::Continue(());
                }
                warn!(port = port, "heartbeat found claimed port free, releasing");
                inner.remove_where(|c| c.id == id);
                ControlFlow::Break(())
            }
        })
    }

    fn remove_where(&self, matches: impl Fn(&Claim) -> bool) -> Option<Claim> {
        let entry = {
            let mut state = self.state.write();
            let index = state.entries.iter().position(|e| matches(&e.claim))?;
            state.entries.remove(index)
        };

        let claim = entry.claim.clone();
        // Cancels the heartbeat before the notification goes out.
        drop(entry);

        debug!(name = %claim.name, port = claim.port, "released");
        self.notifier.emit(&PortEvent::Release(claim.clone()));
        Some(claim)
    }
}
