pub mod gate;
pub mod handlers;
pub mod role;
pub mod session;

pub use gate::{authorize, Decision, RoleSet, RouteTable, RouteTableError};
pub use role::Role;
pub use session::{Principal, PrincipalStore, StoreError};
