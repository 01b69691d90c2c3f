/// Host-level feature switches read from a URL query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// `cage`: whether the grid and field are drawn at all. `None` when the
    /// query does not mention it.
    pub cage: Option<bool>,
}

impl FeatureFlags {
    /// Parse `?cage=1&...`. The leading `?` is optional; unknown keys and
    /// unparseable values are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut flags = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key != "cage" {
                continue;
            }
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "" => flags.cage = Some(true),
                "0" | "false" | "off" => flags.cage = Some(false),
                other => log::warn!("ignoring cage={}", other),
            }
        }
        flags
    }

    pub fn render_enabled(&self, default: bool) -> bool {
        self.cage.unwrap_or(default)
    }
}
