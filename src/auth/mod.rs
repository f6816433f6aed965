pub mod authentication;
pub mod clerk;
pub mod permissions;
pub mod session;
pub mod user;

pub use authentication::*;
pub use clerk::*;
pub use permissions::*;
pub use session::*;
pub use user::*;
