pub mod proposal;
pub mod reply;
pub mod session;
pub mod time;

pub use proposal::*;
pub use reply::*;
pub use session::*;
pub use time::*;
