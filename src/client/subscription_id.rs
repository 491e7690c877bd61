use std::num::NonZeroUsize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// An opaque identifier for a subscription
///
/// Identifiers are allocated from a counter and never reused for the
/// lifetime of a connection.  Currently this wraps a `NonZeroUsize` though
/// that may be subject to change in the future - as a result the underlying
/// type is not exposed publically
pub struct SubscriptionId(NonZeroUsize);

impl SubscriptionId {
    pub(super) fn new(id: usize) -> Option<Self> {
        Some(SubscriptionId(NonZeroUsize::new(id)?))
    }

    #[expect(clippy::inherent_to_string)] // Don't want this to be public, which implementing Display would make it.
    pub(crate) fn to_string(self) -> String {
        self.0.to_string()
    }

    pub(super) fn from_str(s: &str) -> Option<Self> {
        SubscriptionId::new(s.parse::<usize>().ok()?)
    }
}
