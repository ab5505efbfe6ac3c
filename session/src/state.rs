//! Session state.
//!
//! [`Session`] is the state managed by the session reducer and the snapshot
//! published to readers after every transition. It is process-resident and
//! never persisted; on restart the auth provider's first notification
//! rebuilds it.

use crate::actions::RequestId;
use crate::error::SessionError;
use crate::identity::{Identity, IdentityId};
use crate::profile::Profile;

/// Where the session is in the identity lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Waiting for the provider's first notification.
    Initializing,

    /// No identity.
    SignedOut,

    /// Identity known, profile lookup outstanding (or failed).
    SignedInProfilePending {
        /// The signed-in identity.
        identity: Identity,
    },

    /// Identity known and its profile lookup finished.
    ///
    /// `profile` is `None` when the store holds no document for the identity.
    SignedIn {
        /// The signed-in identity.
        identity: Identity,
        /// The identity's profile document, if one exists.
        profile: Option<Profile>,
    },
}

impl SessionPhase {
    /// Returns `true` once a profile lookup has finished for the identity.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }

    /// Returns `true` when there is no identity and startup is over.
    #[must_use]
    pub const fn is_signed_out(&self) -> bool {
        matches!(self, Self::SignedOut)
    }

    /// The identity, in either signed-in phase.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedInProfilePending { identity } | Self::SignedIn { identity, .. } => {
                Some(identity)
            },
            Self::Initializing | Self::SignedOut => None,
        }
    }
}

/// A profile lookup in flight.
///
/// Each lookup gets a fresh sequence number. Only the result carrying the
/// ticket currently in flight is applied; anything else is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    /// Monotonic lookup sequence number.
    pub seq: u64,

    /// Identity whose profile is being fetched.
    pub identity_id: IdentityId,
}

/// Bookkeeping for profile reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Reconciliation {
    /// Last sequence number handed out.
    pub(crate) last_seq: u64,

    /// Lookup whose result will be applied, if any.
    pub(crate) in_flight: Option<LookupTicket>,
}

impl Reconciliation {
    /// Issue a ticket for `identity_id`, superseding any lookup in flight.
    pub(crate) fn issue(&mut self, identity_id: IdentityId) -> LookupTicket {
        self.last_seq += 1;
        let ticket = LookupTicket {
            seq: self.last_seq,
            identity_id,
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }
}

/// The published session: identity, profile, loading flag and last error.
///
/// # Examples
///
/// ```
/// # use safeguard_session::{Session, SessionPhase};
/// let session = Session::default();
/// assert!(session.is_loading());
/// assert_eq!(session.phase(), &SessionPhase::Initializing);
/// assert!(session.identity().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub(crate) phase: SessionPhase,
    pub(crate) is_loading: bool,
    pub(crate) last_error: Option<SessionError>,
    /// Operation whose caller gave up waiting; its late success clears the timeout.
    pub(crate) timed_out: Option<RequestId>,
    pub(crate) reconciliation: Reconciliation,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            is_loading: true,
            last_error: None,
            timed_out: None,
            reconciliation: Reconciliation::default(),
        }
    }
}

impl Session {
    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.phase.identity()
    }

    /// Profile of the signed-in identity, once loaded and present.
    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        match &self.phase {
            SessionPhase::SignedIn { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    /// `true` until the provider's first notification has been resolved.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Most recent operation failure, cleared when the next operation starts.
    #[must_use]
    pub const fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Lookup whose result the session is waiting for.
    #[must_use]
    pub const fn pending_lookup(&self) -> Option<&LookupTicket> {
        self.reconciliation.in_flight.as_ref()
    }
}
