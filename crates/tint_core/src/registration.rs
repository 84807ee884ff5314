//! Registration strings and pattern matching
//!
//! A registration names an interface record hierarchically:
//!
//! ```text
//!   sw/org.example/color/icc_color.lcms._CPU
//!   │  │           │     │         │    └─ implementation attribute
//!   │  │           │     │         └─ attribute
//!   │  │           │     └─ application / key level
//!   │  │           └─ type
//!   │  └─ domain
//!   └─ top
//! ```
//!
//! Levels are separated by `/`, attributes within a level by `.`.
//!
//! Patterns use the same shape. An empty pattern level is a wildcard. A
//! pattern made of a single level is compared against the last level of the
//! registration only. Each pattern attribute may carry a prefix:
//!
//! - `+` (default) the attribute is required and adds one to the rank
//! - `_` the attribute is optional and adds one to the rank when present
//! - `-` the attribute must not be present
//!
//! A leading interface digit (`4+icc`, `7-lcms`) scopes the attribute to
//! the interface kind with that digit; it is ignored for other kinds.

/// Separator between levels
pub const LEVEL_SEP: char = '/';

/// Separator between attributes of a level
pub const ATTR_SEP: char = '.';

/// Named levels of a registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegField {
    Top,
    Domain,
    Type,
    Application,
    /// Everything after the application level
    Options,
    /// Name of the last level, without attributes
    Key,
}

/// Extract one field of a registration
pub fn field(registration: &str, field: RegField) -> Option<&str> {
    let level = |n: usize| registration.split(LEVEL_SEP).nth(n).filter(|l| !l.is_empty());
    match field {
        RegField::Top => level(0),
        RegField::Domain => level(1),
        RegField::Type => level(2),
        RegField::Application => level(3),
        RegField::Options => registration
            .splitn(5, LEVEL_SEP)
            .nth(4)
            .filter(|l| !l.is_empty()),
        RegField::Key => registration
            .rsplit(LEVEL_SEP)
            .next()
            .and_then(|last| last.split(ATTR_SEP).next())
            .filter(|k| !k.is_empty()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MatchMode {
    Required,
    Optional,
    Excluded,
}

struct PatternAttr<'a> {
    api: Option<char>,
    mode: MatchMode,
    name: &'a str,
}

fn mode_of(c: char) -> Option<MatchMode> {
    match c {
        '+' => Some(MatchMode::Required),
        '_' => Some(MatchMode::Optional),
        '-' => Some(MatchMode::Excluded),
        _ => None,
    }
}

fn parse_attr(attr: &str) -> PatternAttr<'_> {
    let mut chars = attr.chars();
    let first = chars.next();
    let second = chars.next();
    if let (Some(digit), Some(mode)) = (first, second.and_then(mode_of)) {
        if digit.is_ascii_digit() {
            return PatternAttr {
                api: Some(digit),
                mode,
                name: &attr[2..],
            };
        }
    }
    match first.and_then(mode_of) {
        Some(mode) => PatternAttr {
            api: None,
            mode,
            name: &attr[1..],
        },
        None => PatternAttr {
            api: None,
            mode: MatchMode::Required,
            name: attr,
        },
    }
}

fn match_level(reg_level: &str, pattern_level: &str, api: Option<char>, rank: &mut u32) -> bool {
    let present: Vec<&str> = reg_level
        .split(ATTR_SEP)
        .map(|a| a.strip_prefix('_').unwrap_or(a))
        .collect();

    for attr in pattern_level.split(ATTR_SEP).filter(|a| !a.is_empty()) {
        let attr = parse_attr(attr);
        if attr.name.is_empty() {
            continue;
        }
        if attr.api.is_some() && attr.api != api {
            continue;
        }
        let found = present.contains(&attr.name);
        match attr.mode {
            MatchMode::Required if found => *rank += 1,
            MatchMode::Required => return false,
            MatchMode::Optional if found => *rank += 1,
            MatchMode::Optional => {}
            MatchMode::Excluded if found => return false,
            MatchMode::Excluded => {}
        }
    }
    true
}

/// Match a registration against a pattern.
///
/// Returns `0` for no match, otherwise the number of matched attributes
/// (at least `1`). `api` is the digit of the interface kind asking, if any.
pub fn registration_match(registration: &str, pattern: &str, api: Option<char>) -> u32 {
    if pattern.is_empty() {
        return 1;
    }
    let levels: Vec<&str> = registration.split(LEVEL_SEP).collect();
    let mut rank = 0;

    if !pattern.contains(LEVEL_SEP) {
        let key = levels.last().copied().unwrap_or("");
        return if match_level(key, pattern, api, &mut rank) {
            rank.max(1)
        } else {
            0
        };
    }

    // Levels beyond the shorter of the two are not compared
    for (reg_level, pattern_level) in levels.iter().zip(pattern.split(LEVEL_SEP)) {
        if pattern_level.is_empty() {
            continue;
        }
        if !match_level(reg_level, pattern_level, api, &mut rank) {
            return 0;
        }
    }
    rank.max(1)
}

/// Match only the last level of a registration against `key`, which may
/// carry attributes and prefixes like any pattern level
pub fn registration_match_key(registration: &str, key: &str, api: Option<char>) -> u32 {
    let last = registration.rsplit(LEVEL_SEP).next().unwrap_or("");
    let mut rank = 0;
    if match_level(last, key, api, &mut rank) {
        rank.max(1)
    } else {
        0
    }
}

/// Remove implementation attributes (those starting with `_`) from every
/// level. Two registrations that differ only in such attributes describe
/// the same capability.
pub fn strip_implementation_attrs(registration: &str) -> String {
    registration
        .split(LEVEL_SEP)
        .map(|level| {
            level
                .split(ATTR_SEP)
                .enumerate()
                .filter(|(i, attr)| *i == 0 || !attr.starts_with('_'))
                .map(|(_, attr)| attr)
                .collect::<Vec<_>>()
                .join(".")
        })
        .collect::<Vec<_>>()
        .join("/")
}
