//! Version triples and the host API compatibility gate

use std::cmp::Ordering;
use std::fmt;

/// Three-part version used by modules and interface records
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    /// Create a new version
    #[inline]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self { major, minor, patch }
    }

    /// Version 0.0.0
    pub const ZERO: Version = Version::new(0, 0, 0);

    /// Whether all three parts are zero
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }

    /// Collapse to the integer form used by the compatibility gate,
    /// `major * 10000 + minor * 100 + patch`.
    #[inline]
    pub const fn api_number(&self) -> u32 {
        self.major as u32 * 10000 + self.minor as u32 * 100 + self.patch as u32
    }

    /// Expand an integer produced by [`Version::api_number`]
    pub const fn from_api_number(n: u32) -> Self {
        Self {
            major: (n / 10000) as u16,
            minor: ((n / 100) % 100) as u16,
            patch: (n % 100) as u16,
        }
    }

    /// Parse from string "major.minor.patch"; missing parts are zero
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self { major, minor, patch })
    }

    /// Convert to a single u64 for easy comparison
    #[inline]
    pub const fn to_u64(&self) -> u64 {
        (self.major as u64) << 32 | (self.minor as u64) << 16 | self.patch as u64
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u64().cmp(&other.to_u64())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self)
    }
}

/// API version this host implements
pub const HOST_API_VERSION: Version = Version::new(1, 3, 0);

/// Oldest module API the host can still talk to; everything built against an
/// earlier API predates the last layout break.
pub const LAST_API_BREAK: Version = Version::new(1, 0, 0);

/// Outcome of the compatibility gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiCompat {
    Compatible,
    /// Built before the last breaking change
    TooOld,
    /// Built against a newer host than this one
    TooNew,
}

/// Gate a module API version against a host API version
pub fn api_compat(module_api: Version, host: Version) -> ApiCompat {
    let n = module_api.api_number();
    if n < LAST_API_BREAK.api_number() {
        ApiCompat::TooOld
    } else if n > host.api_number() {
        ApiCompat::TooNew
    } else {
        ApiCompat::Compatible
    }
}

/// Macro for creating versions at compile time
#[macro_export]
macro_rules! version {
    ($major:literal . $minor:literal . $patch:literal) => {
        $crate::Version::new($major, $minor, $patch)
    };
    ($major:literal . $minor:literal) => {
        $crate::Version::new($major, $minor, 0)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
        assert_eq!(Version::parse("0.9").unwrap(), Version::new(0, 9, 0));
        assert!(Version::parse("1.2.3.4").is_none());
        assert!(Version::parse("x").is_none());
    }

    #[test]
    fn test_api_number() {
        assert_eq!(Version::new(0, 9, 6).api_number(), 906);
        assert_eq!(Version::new(1, 3, 0).api_number(), 10300);
        assert_eq!(Version::from_api_number(10203), Version::new(1, 2, 3));
    }

    #[test]
    fn test_api_gate() {
        assert_eq!(api_compat(Version::new(0, 9, 9), HOST_API_VERSION), ApiCompat::TooOld);
        assert_eq!(api_compat(LAST_API_BREAK, HOST_API_VERSION), ApiCompat::Compatible);
        assert_eq!(api_compat(HOST_API_VERSION, HOST_API_VERSION), ApiCompat::Compatible);
        assert_eq!(api_compat(Version::new(1, 3, 1), HOST_API_VERSION), ApiCompat::TooNew);
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(1, 0, 0) < Version::new(1, 1, 0));
        assert!(Version::new(1, 1, 0) < Version::new(2, 0, 0));
    }
}
