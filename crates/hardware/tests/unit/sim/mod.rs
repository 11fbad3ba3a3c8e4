
/// Attach, access, reset and state through the session.
pub mod session;
