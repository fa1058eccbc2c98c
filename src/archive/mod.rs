//! The archiving pipeline.
//!
//! ```text
//! ChannelResolver → ArchiveDriver → MessageStream
//!                        ↓
//!   ThreadFetcher, SenderResolver, ReactionAggregator
//!                        ↓
//!          DocumentRenderer → DocumentWriter
//! ```

pub mod driver;
pub mod reactions;
pub mod render;
pub mod resolver;
pub mod sender;
pub mod stream;
pub mod thread;
pub mod writer;

pub use driver::{ArchiveCursor, ArchiveDriver, ArchiveSummary, DriverSettings};
pub use reactions::ReactionAggregator;
pub use render::DocumentRenderer;
pub use resolver::ChannelResolver;
pub use sender::SenderResolver;
pub use stream::MessageStream;
pub use thread::ThreadFetcher;
pub use writer::DocumentWriter;
