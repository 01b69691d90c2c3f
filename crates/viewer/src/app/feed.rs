//! Upstream parameter feed for the native viewer: one JSON object per line
//! on stdin.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use warpfield::WarpParams;

/// Parse one feed line. Blank lines and `#` comments yield `None`, as do
/// malformed lines (logged).
pub fn parse_feed_line(line: &str) -> Option<WarpParams> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match WarpParams::from_json(line) {
        Ok(patch) => Some(patch),
        Err(e) => {
            log::warn!("skipping feed line: {}", e);
            None
        }
    }
}

/// Read patches from `reader` on a background thread. The channel closes
/// when the reader hits EOF or an I/O error.
pub fn spawn_reader<R>(reader: R) -> Receiver<WarpParams>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("feed read failed: {}", e);
                    break;
                }
            };
            if let Some(patch) = parse_feed_line(&line) {
                if tx.send(patch).is_err() {
                    break;
                }
            }
        }
        log::debug!("feed closed");
    });
    rx
}

pub fn spawn_stdin_reader() -> Receiver<WarpParams> {
    spawn_reader(std::io::BufReader::new(std::io::stdin()))
}
