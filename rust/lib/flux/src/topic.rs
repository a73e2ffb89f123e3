//! Path patterns with MQTT-style wildcards.
//!
//! - `+` matches exactly one level
//! - `#` matches every remaining level, including none; only valid last
//!
//! Patterns are parsed once at subscribe/register time and matched against
//! concrete paths on every `set` or `emit`.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Exact(String),
    Single,
    Multi,
}

/// A parsed subscription or handler pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern. A `#` anywhere but the last level is treated as a
    /// literal segment, so `a/#/b` only matches the path `a/#/b`.
    pub fn parse(pattern: &str) -> Self {
        let levels: Vec<&str> = pattern.split('/').collect();
        let last = levels.len().saturating_sub(1);
        let segments = levels
            .iter()
            .enumerate()
            .map(|(i, level)| match *level {
                "+" => Segment::Single,
                "#" if i == last => Segment::Multi,
                other => Segment::Exact(other.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True if this pattern has no wildcards.
    pub fn is_exact(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Exact(_)))
    }

    /// Check whether a concrete path matches.
    pub fn matches(&self, path: &str) -> bool {
        let mut levels = path.split('/');
        for segment in &self.segments {
            match segment {
                Segment::Multi => return true,
                Segment::Single => {
                    if levels.next().is_none() {
                        return false;
                    }
                }
                Segment::Exact(expected) => match levels.next() {
                    Some(level) if level == expected => {}
                    _ => return false,
                },
            }
        }
        levels.next().is_none()
    }
}
