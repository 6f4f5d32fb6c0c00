mod cert;
mod record;
mod target;

pub use cert::*;
pub use record::*;
pub use target::*;
