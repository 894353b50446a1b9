mod session;

pub use session::{IdentityFeed, SessionService};
