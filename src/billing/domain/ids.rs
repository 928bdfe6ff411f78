//! Identifier newtypes for the billing domain.

use super::BillingDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = BillingDomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| BillingDomainError::InvalidIdentifier {
                        kind: $kind,
                        value: value.to_owned(),
                    })
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of the freelancer owning projects, timers and invoices.
    UserId,
    "user"
);
uuid_identifier!(
    /// Identifier of a billed client.
    ClientId,
    "client"
);
uuid_identifier!(
    /// Identifier of a client project.
    ProjectId,
    "project"
);
uuid_identifier!(
    /// Identifier of a project task.
    TaskId,
    "task"
);
uuid_identifier!(
    /// Identifier of a single work session.
    TimeEntryId,
    "time entry"
);
uuid_identifier!(
    /// Identifier of an invoice.
    InvoiceId,
    "invoice"
);
uuid_identifier!(
    /// Identifier of an invoice line item.
    InvoiceItemId,
    "invoice item"
);
