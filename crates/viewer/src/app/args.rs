use std::path::PathBuf;

use warpfield::FeatureFlags;

pub const USAGE: &str = "usage: warp-viewer [config.json|config.yaml] [--flags cage=0]";

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub flags: FeatureFlags,
}

/// Parse arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut out = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--flags" => {
                let query = iter.next().ok_or("--flags needs a value")?;
                out.flags = FeatureFlags::from_query(query);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with("--") => {
                return Err(format!("unknown option {}\n{}", other, USAGE));
            }
            path => {
                if out.config.is_some() {
                    return Err(format!("unexpected argument {}\n{}", path, USAGE));
                }
                out.config = Some(PathBuf::from(path));
            }
        }
    }
    Ok(out)
}
