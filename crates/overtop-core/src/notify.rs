#![forbid(unsafe_code)]

//! Cancelable notification envelope.
//!
//! A notification is dispatched to listeners wrapped in a [`Cancelable`].
//! Listeners may veto the default action with
//! [`Cancelable::prevent_default`]; the dispatcher checks
//! [`Cancelable::is_default_prevented`] afterwards. Vetoing a
//! non-cancelable notification has no effect.

/// A payload plus its cancellation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelable<T> {
    payload: T,
    cancelable: bool,
    default_prevented: bool,
}

impl<T> Cancelable<T> {
    /// Wrap a payload whose default action may be vetoed.
    pub const fn new(payload: T) -> Self {
        Self {
            payload,
            cancelable: true,
            default_prevented: false,
        }
    }

    /// Wrap a payload that cannot be vetoed.
    pub const fn fixed(payload: T) -> Self {
        Self {
            payload,
            cancelable: false,
            default_prevented: false,
        }
    }

    /// The wrapped payload.
    #[inline]
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// Whether listeners may veto the default action.
    #[inline]
    pub const fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Veto the default action. Ignored when not cancelable.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Whether a listener vetoed the default action.
    #[inline]
    pub const fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Unwrap the payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelable_can_be_prevented() {
        let mut n = Cancelable::new("outside-click");
        assert!(n.is_cancelable());
        assert!(!n.is_default_prevented());
        n.prevent_default();
        assert!(n.is_default_prevented());
        assert_eq!(n.into_payload(), "outside-click");
    }

    #[test]
    fn fixed_ignores_prevent_default() {
        let mut n = Cancelable::fixed(7);
        n.prevent_default();
        assert!(!n.is_default_prevented());
        assert_eq!(*n.payload(), 7);
    }
}
