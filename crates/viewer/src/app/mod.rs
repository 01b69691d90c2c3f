//! Native host: two winit windows sharing one upstream feed.

pub mod args;
pub mod feed;
pub mod runner;
pub mod status;

pub use args::{parse_args, Args, USAGE};
pub use feed::{parse_feed_line, spawn_stdin_reader};
pub use runner::{run, ViewerOptions};
pub use status::TitleStatus;
