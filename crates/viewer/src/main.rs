//! Native warp field viewer.
//!
//! Run with: cargo run -p warp-viewer -- [config.yaml] [--flags cage=0]
//!
//! Parameter patches are read from stdin, one JSON object per line, e.g.
//! `{"dutyCycle": 0.2, "g_y": 30}`.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use warp_viewer::app::{self, ViewerOptions};
    use warpfield::EngineConfig;

    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match app::parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let feed = app::spawn_stdin_reader();
    let options = ViewerOptions {
        config,
        flags: args.flags,
    };
    if let Err(e) = app::run(options, feed) {
        log::error!("viewer exited with error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
