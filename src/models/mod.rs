mod alias;
mod profile;
mod progress;
mod routine;
mod streak;
mod subscription;

pub use alias::*;
pub use profile::*;
pub use progress::*;
pub use routine::*;
pub use streak::*;
pub use subscription::*;
