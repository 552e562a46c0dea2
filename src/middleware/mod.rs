mod creator_auth;

pub use creator_auth::*;
