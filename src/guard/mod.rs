pub mod clock;
pub mod ledger;
pub mod login_guard;
pub mod sweeper;

pub use clock::*;
pub use login_guard::*;
pub use sweeper::*;
