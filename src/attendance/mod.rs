pub mod draft;
pub mod guard;
pub mod reconcile;

pub use draft::{field_name, Draft, Status};
pub use guard::{InFlight, SaveGuard};
pub use reconcile::{ReconcileError, Reconciler, SessionBackend, SessionKey};
