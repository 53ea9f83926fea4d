// Page layout: font metrics, line wrapping and placement of the render plan onto
// fixed-size pages. Pure and CPU-bound; callers on the runtime go through
// tokio::task::spawn_blocking.

pub mod composer;
pub mod font_metrics;
