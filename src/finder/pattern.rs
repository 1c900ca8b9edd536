/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Wildcard path patterns compiled to anchored regular expressions

use crate::error::{Error, Result};
use regex::Regex;

/// Regex fragment a `*` segment expands to
const WILDCARD: &str = r"[^\.]+";

/// A Graphite path pattern compiled into a matcher
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile `pattern`: `.` and the leaf/value `delimiter` match themselves
    /// only, `*` matches one or more non-dot characters, and the whole name
    /// must match
    pub fn compile(pattern: &str, delimiter: &str) -> Result<Self> {
        let source = translate(pattern, delimiter);
        let regex = Regex::new(&source).map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as given
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled regular expression source
    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }
}

/// Characters other than `.`, `*` and the delimiter pass through, so `[ab]`
/// stays a class.
fn translate(pattern: &str, delimiter: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 16);
    source.push('^');
    if delimiter.is_empty() {
        translate_segments(pattern, &mut source);
    } else {
        let literal = regex::escape(delimiter);
        for (i, part) in pattern.split(delimiter).enumerate() {
            if i > 0 {
                source.push_str(&literal);
            }
            translate_segments(part, &mut source);
        }
    }
    source.push('$');
    source
}

fn translate_segments(part: &str, source: &mut String) {
    for ch in part.chars() {
        match ch {
            '.' => source.push_str(r"\."),
            '*' => source.push_str(WILDCARD),
            other => source.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIMITER: &str = "._field_";

    #[test]
    fn test_translate() {
        assert_eq!(translate("host.*.load", DELIMITER), r"^host\.[^\.]+\.load$");
        assert_eq!(translate("*", DELIMITER), r"^[^\.]+$");
        assert_eq!(
            translate("servers.*._field_load", DELIMITER),
            r"^servers\.[^\.]+\._field_load$"
        );
        assert_eq!(translate("a.*|load", "|"), r"^a\.[^\.]+\|load$");
    }

    #[test]
    fn test_wildcard_matches_one_segment() {
        let pattern = PathPattern::compile("host.*.load", DELIMITER).unwrap();
        assert!(pattern.is_match("host.cpu.load"));
        assert!(pattern.is_match("host.mem.load"));
        assert!(!pattern.is_match("host.cpu.sub.load"));
        assert!(!pattern.is_match("host..load"));
    }

    #[test]
    fn test_match_is_anchored() {
        let pattern = PathPattern::compile("servers.web1", DELIMITER).unwrap();
        assert!(pattern.is_match("servers.web1"));
        assert!(!pattern.is_match("servers.web1._field_load"));
        assert!(!pattern.is_match("old.servers.web1"));
    }

    #[test]
    fn test_dot_is_literal() {
        let pattern = PathPattern::compile("a.b", DELIMITER).unwrap();
        assert!(!pattern.is_match("axb"));
    }

    #[test]
    fn test_partial_segment_wildcard() {
        let pattern = PathPattern::compile("servers.web*", DELIMITER).unwrap();
        assert!(pattern.is_match("servers.web1"));
        assert!(pattern.is_match("servers.web12"));
        assert!(!pattern.is_match("servers.web"));
    }

    #[test]
    fn test_character_class_passes_through() {
        let pattern = PathPattern::compile("servers.web[12]", DELIMITER).unwrap();
        assert!(pattern.is_match("servers.web1"));
        assert!(!pattern.is_match("servers.web3"));
    }

    #[test]
    fn test_delimiter_is_literal() {
        let pattern = PathPattern::compile("servers.*|load", "|").unwrap();
        assert!(pattern.is_match("servers.web1|load"));
        assert!(!pattern.is_match("servers.web1|cpu"));
        assert!(!pattern.is_match("other|load"));

        let pattern = PathPattern::compile("a+b.*", "+").unwrap();
        assert!(pattern.is_match("a+b.c"));
        assert!(!pattern.is_match("aab.c"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathPattern::compile("servers.(web", DELIMITER).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }
}
