pub mod channel;
pub mod plan;
pub mod playback;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod snapshot;

pub use channel::*;
pub use plan::*;
pub use playback::*;
pub use prompt::*;
pub use session::*;
pub use settings::*;
pub use snapshot::*;
