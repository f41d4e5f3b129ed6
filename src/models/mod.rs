pub mod user;
pub mod analysis;

pub use user::*;
pub use analysis::*;
