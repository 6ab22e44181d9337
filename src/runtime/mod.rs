//! Call routing: the redirect collaborator, the interception router and the
//! typed entry points used by mocked associated functions.

pub mod intercept;
pub mod redirect;
pub mod router;

pub use intercept::{intercept, to_argument, try_intercept};
pub use redirect::{DispatchTable, RedirectToken, Redirector, RouterCallback};
pub use router::{Routed, Router};
