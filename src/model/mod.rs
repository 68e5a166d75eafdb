//! Domain records: sheets, laser-cut parts, components, nests and quotes.
//!
//! Ownership follows the shop's paperwork: a [`Nest`] owns its parts, a
//! [`Quote`] owns its nests and components, and the quote's grouped part
//! list is a derived cache rebuilt from the nests, never edited as a
//! source of truth.

pub mod component;
pub mod nest;
pub mod part;
pub mod quote;
pub mod sheet;

pub use component::Component;
pub use nest::Nest;
pub use part::{GroupedLaserCutPart, LaserCutPart, PaintSettings};
pub use quote::{Quote, QuoteSettings};
pub use sheet::Sheet;

use std::cmp::Ordering;

/// Compare two strings the way a person sorts file names: digit runs are
/// compared by numeric value, so `"Part-2"` sorts before `"Part-10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_digits(&mut left);
                let rn = take_digits(&mut right);
                let ord = compare_digit_runs(&ln, &rn);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_compare_numerically() {
        assert_eq!(natural_cmp("Part-2", "Part-10"), Ordering::Less);
        assert_eq!(natural_cmp("Part-10", "Part-2"), Ordering::Greater);
        assert_eq!(natural_cmp("nest 007", "nest 7"), Ordering::Less);
    }

    #[test]
    fn letters_ignore_case() {
        assert_eq!(natural_cmp("bracket", "Cover"), Ordering::Less);
        assert_eq!(natural_cmp("A", "A"), Ordering::Equal);
    }

    #[test]
    fn sorting_a_list() {
        let mut names = vec!["N-10.pdf", "N-9.pdf", "N-1.pdf"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["N-1.pdf", "N-9.pdf", "N-10.pdf"]);
    }
}
