pub mod error;
pub mod message;
pub mod video;

pub use error::{Error, Result};
pub use message::{Message, Role, now_millis};
pub use video::{VideoContext, extract_video_id};
