pub mod channel;
pub mod post;
pub mod reaction;
pub mod sender;

pub use channel::{ChannelIdentity, Dialog};
pub use post::{Comment, Post};
pub use reaction::ReactionTally;
pub use sender::SenderIdentity;
