/// Handle to a registered capability listener.
///
/// Dropping the handle (or calling [`Subscription::dispose`]) detaches the
/// listener. Disposal runs at most once.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    label: String,
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn dispose(mut self) {
        self.run_disposer();
    }

    fn run_disposer(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            tracing::debug!(subscription = %self.label, "Detaching capability listener");
            disposer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_disposer();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.disposer.is_some())
            .finish()
    }
}

/// Owns every subscription made for one mounted dashboard.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sub: Subscription) {
        self.subs.push(sub);
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Dispose every subscription, returning how many were detached.
    pub fn dispose_all(&mut self) -> usize {
        let n = self.subs.len();
        for sub in self.subs.drain(..) {
            sub.dispose();
        }
        n
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subs.extend(iter);
    }
}
