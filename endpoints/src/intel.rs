use std::{
    collections::BTreeSet,
    fmt,
    net::IpAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use crate::{error::LookupError, scope::ScopeClassifier};

/// Lookups a bounded [Intel] runs at once, unless set otherwise.
pub const DEFAULT_MAX_PENDING_LOOKUPS: usize = 64;

/// Resolves the autonomous system an IP belongs to.
pub trait AsnResolver: Send + Sync {
    /// `Ok(None)` when the address is not announced by any known AS.
    fn resolve_asn(&self, ip: &IpAddr) -> Result<Option<u32>, LookupError>;
}

/// Resolves the country an IP is located in.
pub trait CountryResolver: Send + Sync {
    /// Two letter upper-case country code, `Ok(None)` when unknown.
    fn resolve_country(&self, ip: &IpAddr) -> Result<Option<String>, LookupError>;
}

/// What a block-list is queried for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListSubject {
    /// Fully qualified, lower-case domain.
    Domain(String),
    Ip(IpAddr),
}

/// Block-list membership oracle.
pub trait ListOracle: Send + Sync {
    /// Ids of all lists that contain `subject`.
    fn lists_for(&self, subject: &ListSubject) -> Result<BTreeSet<String>, LookupError>;

    /// Whether `subject` is on any of `list_ids`.
    fn member(&self, subject: &ListSubject, list_ids: &[String]) -> Result<bool, LookupError> {
        let lists = self.lists_for(subject)?;
        Ok(list_ids.iter().any(|id| lists.contains(id)))
    }
}

/// Collaborators an [Entity](crate::Entity) resolves its derived attributes with.
///
/// Missing collaborators make the attributes they provide unavailable, which
/// leaves the matchers that need them indeterminate.
#[derive(Clone, Default)]
pub struct Intel {
    asn: Option<Arc<dyn AsnResolver>>,
    country: Option<Arc<dyn CountryResolver>>,
    lists: Option<Arc<dyn ListOracle>>,
    scope: ScopeClassifier,
    deadline: Option<Deadline>,
}

#[derive(Debug, Clone)]
struct Deadline {
    timeout: Duration,
    max_pending: usize,
    // shared by clones, lookups that outlived their deadline still count
    pending: Arc<AtomicUsize>,
}

impl Intel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asn_resolver(self, resolver: impl AsnResolver + 'static) -> Self {
        Self {
            asn: Some(Arc::new(resolver)),
            ..self
        }
    }

    pub fn with_country_resolver(self, resolver: impl CountryResolver + 'static) -> Self {
        Self {
            country: Some(Arc::new(resolver)),
            ..self
        }
    }

    pub fn with_list_oracle(self, oracle: impl ListOracle + 'static) -> Self {
        Self {
            lists: Some(Arc::new(oracle)),
            ..self
        }
    }

    pub fn with_scope_classifier(self, scope: ScopeClassifier) -> Self {
        Self { scope, ..self }
    }

    /// Bounds every lookup to `timeout`.
    ///
    /// A lookup that does not answer in time fails with [`LookupError::Timeout`].
    /// The lookup itself keeps running on its own thread until it returns, and
    /// at most [DEFAULT_MAX_PENDING_LOOKUPS] of them run at once.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let max_pending = self
            .deadline
            .as_ref()
            .map_or(DEFAULT_MAX_PENDING_LOOKUPS, |d| d.max_pending);
        Self {
            deadline: Some(Deadline {
                timeout,
                max_pending,
                pending: Arc::default(),
            }),
            ..self
        }
    }

    /// Caps the lookups running at once, counting those that already missed
    /// their deadline. Past the cap lookups fail with [`LookupError::Timeout`]
    /// without being started. Only applies together with
    /// [`with_timeout`](Intel::with_timeout).
    pub fn with_max_pending_lookups(mut self, max_pending: usize) -> Self {
        if let Some(deadline) = &mut self.deadline {
            deadline.max_pending = max_pending;
        }
        self
    }

    pub fn scope_classifier(&self) -> &ScopeClassifier {
        &self.scope
    }

    pub(crate) fn resolve_asn(&self, ip: IpAddr) -> Option<Result<Option<u32>, LookupError>> {
        let resolver = self.asn.clone()?;
        Some(self.run("asn", move || resolver.resolve_asn(&ip)))
    }

    pub(crate) fn resolve_country(
        &self,
        ip: IpAddr,
    ) -> Option<Result<Option<String>, LookupError>> {
        let resolver = self.country.clone()?;
        Some(self.run("country", move || {
            resolver
                .resolve_country(&ip)
                .map(|code| code.map(|code| code.to_ascii_uppercase()))
        }))
    }

    /// Union of the lists of every subject.
    pub(crate) fn resolve_lists(
        &self,
        subjects: Vec<ListSubject>,
    ) -> Option<Result<BTreeSet<String>, LookupError>> {
        let oracle = self.lists.clone()?;
        Some(self.run("list", move || {
            let mut lists = BTreeSet::new();
            for subject in &subjects {
                lists.extend(oracle.lists_for(subject)?);
            }
            Ok(lists)
        }))
    }

    fn run<T, F>(&self, kind: &'static str, lookup: F) -> Result<T, LookupError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, LookupError> + Send + 'static,
    {
        match &self.deadline {
            Some(deadline) => deadline.run(kind, lookup),
            None => lookup(),
        }
    }
}

impl fmt::Debug for Intel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intel")
            .field("asn", &self.asn.is_some())
            .field("country", &self.country.is_some())
            .field("lists", &self.lists.is_some())
            .field("scope", &self.scope)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Deadline {
    fn run<T, F>(&self, kind: &'static str, lookup: F) -> Result<T, LookupError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, LookupError> + Send + 'static,
    {
        let slot = self.acquire().ok_or_else(|| {
            tracing::warn!(kind, max = self.max_pending, "too many pending lookups");
            LookupError::Timeout(kind)
        })?;

        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name(format!("{kind}-lookup"))
            .spawn(move || {
                let result = {
                    let _slot = slot;
                    lookup()
                };
                // the receiver is gone once the deadline passed
                let _ = tx.send(result);
            })
            .map_err(|e| LookupError::failed(kind, e))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(kind, timeout = ?self.timeout, "lookup timed out");
                Err(LookupError::Timeout(kind))
            }
            // the sender is dropped without sending only if the lookup panicked
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(LookupError::Panicked(kind)),
        }
    }

    fn acquire(&self) -> Option<Slot> {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_pending).then(|| n + 1)
            })
            .ok()
            .map(|_| Slot(self.pending.clone()))
    }
}

/// A running lookup. Frees its place when the lookup returns or unwinds.
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
