//! Error kinds specific to services.

use wonder_stuff_core::{ErrorKind, Errors};

/// Kinds for failures talking to other services, on top of [`Errors`].
pub struct ServerKinds;

impl ServerKinds {
    /// A dependency failed in a way that may succeed on retry.
    pub const TRANSIENT_SERVICE: ErrorKind = ErrorKind::from_static("TransientService");
    /// A dependency failed.
    pub const SERVICE: ErrorKind = ErrorKind::from_static("Service");

    /// The built-in kinds followed by the service kinds.
    #[must_use]
    pub fn all() -> Vec<ErrorKind> {
        Errors::ALL
            .into_iter()
            .chain([Self::TRANSIENT_SERVICE, Self::SERVICE])
            .collect()
    }
}
