//! Log severities.
//!
//! Lower numeric value = more severe. The textual aliases accepted here are
//! the ones configuration files and the command line use to name a level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::UnknownSeverity;

/// Rendering used for a numeric level that maps to no [`Severity`].
pub const UNKNOWN_LEVEL: &str = "?????";

/// Ordered log severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u32)]
pub enum Severity {
    #[default]
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

/// Alias table walked by the parsers, least severe first.
const ALIASES: &[(Severity, &[&str])] = &[
    (Severity::Debug, &["7", "debug", "dbg"]),
    (Severity::Info, &["6", "info", "inf"]),
    (Severity::Notice, &["5", "notice"]),
    (Severity::Warning, &["4", "warning"]),
    (Severity::Error, &["3", "error"]),
    (Severity::Crit, &["2", "critical"]),
    (Severity::Alert, &["1", "alert", "alrt"]),
    (Severity::Emerg, &["0", "emgcy", "emergency"]),
];

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emerg,
        Severity::Alert,
        Severity::Crit,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
    ];

    /// Numeric wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Canonical abbreviation as printed in log lines.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Emerg => "EMGCY",
            Severity::Alert => "ALERT",
            Severity::Crit => "CRIT",
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }

    /// Whether a record at `self` passes a filter set to `threshold`.
    pub fn admits(self, threshold: Severity) -> bool {
        self <= threshold
    }

    /// First textual alias, the spelling written back into config files.
    pub fn alias(self) -> &'static str {
        ALIASES
            .iter()
            .find(|(level, _)| *level == self)
            .map_or("", |(_, names)| names[1])
    }

    fn lookup(text: &str) -> Option<Self> {
        let text = text.trim();
        ALIASES
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(text)))
            .map(|(level, _)| *level)
    }
}

/// Lenient level parser.
///
/// Returns [`Severity::Emerg`] both for `None` and for text that matches no
/// alias, so callers cannot tell an explicit `"emergency"` from garbage.
/// Use [`Severity::from_str`] when that distinction matters.
pub fn parse_level(text: Option<&str>) -> Severity {
    text.and_then(Severity::lookup).unwrap_or_default()
}

/// Canonical name for a raw numeric level, `"?????"` when out of range.
pub fn level_to_string(level: u32) -> &'static str {
    Severity::from_u32(level).map_or(UNKNOWN_LEVEL, Severity::name)
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.alias())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Severity::from_u32(n)
                .ok_or_else(|| serde::de::Error::custom(UnknownSeverity(n.to_string()))),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("dbg", Severity::Debug)]
    #[case("7", Severity::Debug)]
    #[case("DEBUG", Severity::Debug)]
    #[case("inf", Severity::Info)]
    #[case(" Notice ", Severity::Notice)]
    #[case("warning", Severity::Warning)]
    #[case("error", Severity::Error)]
    #[case("critical", Severity::Crit)]
    #[case("alrt", Severity::Alert)]
    #[case("Emergency", Severity::Emerg)]
    #[case("emgcy", Severity::Emerg)]
    fn aliases_resolve(#[case] text: &str, #[case] expected: Severity) {
        assert_eq!(parse_level(Some(text)), expected);
        assert_eq!(text.parse::<Severity>().unwrap(), expected);
    }

    #[test]
    fn lenient_parse_conflates_garbage_with_emerg() {
        assert_eq!(parse_level(Some("bogus")), Severity::Emerg);
        assert_eq!(parse_level(None), Severity::Emerg);
        assert_eq!(parse_level(Some("bogus")).as_u32(), 0);
    }

    #[test]
    fn strict_parse_rejects_garbage() {
        let err = "bogus".parse::<Severity>().unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn raw_levels_render_canonical_names() {
        assert_eq!(level_to_string(0), "EMGCY");
        assert_eq!(level_to_string(4), "WARN");
        assert_eq!(level_to_string(7), "DEBUG");
        assert_eq!(level_to_string(8), "?????");
    }

    #[test]
    fn every_level_has_a_parseable_alias() {
        for level in Severity::ALL {
            assert_eq!(level.alias().parse::<Severity>().unwrap(), level);
        }
    }

    #[test]
    fn lower_value_is_more_severe() {
        assert!(Severity::Emerg < Severity::Debug);
        assert!(Severity::Error.admits(Severity::Info));
        assert!(!Severity::Debug.admits(Severity::Info));
        assert!(Severity::Info.admits(Severity::Info));
    }
}
