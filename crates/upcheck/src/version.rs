//! Dotted-numeric version comparison.
//!
//! Versions are split on `.`; each component is a leading decimal number
//! followed by an optional text suffix. Missing components count as `0`,
//! so `"3" == "3.0"` and `"3.1" > "3"`. For equal numbers a component
//! without suffix sorts after one with a suffix (`"1.0b1" < "1.0"`).

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Component<'a> {
    number: u64,
    suffix: &'a str,
}

impl<'a> Component<'a> {
    const ZERO: Component<'static> = Component {
        number: 0,
        suffix: "",
    };

    fn parse(part: &'a str) -> Self {
        let digits = part.bytes().take_while(u8::is_ascii_digit).count();
        let number = part[..digits].bytes().fold(0u64, |acc, b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        });
        Self {
            number,
            suffix: &part[digits..],
        }
    }
}

impl Ord for Component<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| match (self.suffix.is_empty(), other.suffix.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.suffix.cmp(other.suffix),
            })
    }
}

impl PartialOrd for Component<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.').map(Component::parse);
    let mut right = b.trim().split('.').map(Component::parse);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let l = l.unwrap_or(Component::ZERO);
                let r = r.unwrap_or(Component::ZERO);
                match l.cmp(&r) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                }
            }
        }
    }
}

/// Whether `candidate` is strictly newer than `installed`.
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    compare_versions(candidate, installed) == Ordering::Greater
}
