//! Browser session: state machine, signed cookie codec, and extractors

mod extractors;
mod session;

pub use extractors::{Authenticated, CurrentSession, OptionalAuth};
pub use session::{CookieSettings, SessionCodec, SessionCookie, SessionState, SessionUser};
