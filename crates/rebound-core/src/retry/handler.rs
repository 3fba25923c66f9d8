//! Failure handlers for the recovery drivers.
//!
//! A [`Handler`] declares which failures it is responsible for and, for those,
//! whether another attempt should be made. The drivers scan handlers in order
//! and let the first matching one decide alone.

use std::error::Error;
use std::fmt;

/// Failure types whose concrete cause can be recovered by type.
///
/// Implemented for the type-erased error containers, so a handler can be
/// declared for one concrete error type with [`Handler::on`].
pub trait Failure {
    /// The failure as `K`, if that is what it is.
    fn downcast_ref<K>(&self) -> Option<&K>
    where
        K: Error + Send + Sync + 'static;
}

impl Failure for anyhow::Error {
    fn downcast_ref<K>(&self) -> Option<&K>
    where
        K: Error + Send + Sync + 'static,
    {
        anyhow::Error::downcast_ref::<K>(self)
    }
}

impl Failure for Box<dyn Error + Send + Sync> {
    fn downcast_ref<K>(&self) -> Option<&K>
    where
        K: Error + Send + Sync + 'static,
    {
        let inner: &(dyn Error + Send + Sync + 'static) = &**self;
        inner.downcast_ref::<K>()
    }
}

impl Failure for std::io::Error {
    /// Matches the custom error wrapped by `io::Error::new`/`io::Error::other`.
    fn downcast_ref<K>(&self) -> Option<&K>
    where
        K: Error + Send + Sync + 'static,
    {
        self.get_ref().and_then(|inner| inner.downcast_ref::<K>())
    }
}

type Matcher<'a, E> = Box<dyn Fn(&E) -> bool + Send + 'a>;
type Decider<'a, E> = Box<dyn FnMut(u32, &E) -> bool + Send + 'a>;

/// Matches a kind of failure and decides whether to retry it.
///
/// The decision receives the iteration index (attempts already made) and the
/// failure, and may have side effects such as reporting. Both closures are
/// `Send`, so a driver future holding handlers can move between tokio workers.
pub struct Handler<'a, E: ?Sized> {
    kind: &'static str,
    matches: Matcher<'a, E>,
    decide: Decider<'a, E>,
}

impl<'a, E: ?Sized> Handler<'a, E> {
    /// A handler for failures accepted by `matches`, labelled `kind`.
    ///
    /// For error enums, `matches!` makes the matcher:
    ///
    /// ```rust
    /// use rebound_core::retry::Handler;
    ///
    /// #[derive(Debug)]
    /// enum FetchError { Timeout, NotFound }
    ///
    /// let mut timeouts = Handler::new(
    ///     "timeout",
    ///     |e: &FetchError| matches!(e, FetchError::Timeout),
    ///     |iteration, _| iteration < 3,
    /// );
    /// assert!(timeouts.matches(&FetchError::Timeout));
    /// assert!(!timeouts.matches(&FetchError::NotFound));
    /// assert!(timeouts.should_retry(0, &FetchError::Timeout));
    /// ```
    pub fn new<M, D>(kind: &'static str, matches: M, decide: D) -> Self
    where
        M: Fn(&E) -> bool + Send + 'a,
        D: FnMut(u32, &E) -> bool + Send + 'a,
    {
        Self {
            kind,
            matches: Box::new(matches),
            decide: Box::new(decide),
        }
    }

    /// A handler that claims every failure.
    pub fn any<D>(decide: D) -> Self
    where
        D: FnMut(u32, &E) -> bool + Send + 'a,
    {
        Self::new("any", |_| true, decide)
    }

    /// Label of the failure kind this handler claims.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether this handler is responsible for `failure`.
    pub fn matches(&self, failure: &E) -> bool {
        (self.matches)(failure)
    }

    /// Run the decision for a matched failure.
    pub fn should_retry(&mut self, iteration: u32, failure: &E) -> bool {
        (self.decide)(iteration, failure)
    }
}

impl<'a, E: Failure + ?Sized> Handler<'a, E> {
    /// A handler for failures whose concrete type is `K`.
    ///
    /// ```rust
    /// use rebound_core::retry::Handler;
    /// use std::fmt;
    ///
    /// #[derive(Debug)]
    /// struct Busy;
    /// impl fmt::Display for Busy {
    ///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    ///         f.write_str("busy")
    ///     }
    /// }
    /// impl std::error::Error for Busy {}
    ///
    /// let handler = Handler::<anyhow::Error>::on(|_, _: &Busy| true);
    /// assert!(handler.matches(&anyhow::Error::new(Busy)));
    /// assert!(!handler.matches(&anyhow::anyhow!("other")));
    /// ```
    pub fn on<K, D>(mut decide: D) -> Self
    where
        K: Error + Send + Sync + 'static,
        D: FnMut(u32, &K) -> bool + Send + 'a,
    {
        Self::new(
            std::any::type_name::<K>(),
            |failure: &E| failure.downcast_ref::<K>().is_some(),
            move |iteration, failure: &E| match failure.downcast_ref::<K>() {
                Some(cause) => decide(iteration, cause),
                None => false,
            },
        )
    }
}

impl<E: ?Sized> fmt::Debug for Handler<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
