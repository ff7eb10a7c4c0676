use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares strings the way a person would: case-insensitively, with runs of
/// ASCII digits compared by numeric value. Strings that compare equal this way
/// fall back to plain byte order so the ordering stays total.
///
/// ```
/// use std::cmp::Ordering;
/// use quire::util::natural_cmp;
///
/// assert_eq!(natural_cmp("img2.jpg", "img10.jpg"), Ordering::Less);
/// assert_eq!(natural_cmp("IMG2.jpg", "img1.jpg"), Ordering::Greater);
/// assert_eq!(natural_cmp("a007", "a7"), Ordering::Less);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (a.chars().peekable(), b.chars().peekable());
    loop {
        let ordering = match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                compare_digits(&take_digits(&mut left), &take_digits(&mut right))
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                x.to_lowercase().cmp(y.to_lowercase())
            }
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }

    digits
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_numbered_files() {
        let mut names = vec!["photo10.png", "photo2.png", "Photo1.png", "album", "photo02b.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["album", "Photo1.png", "photo2.png", "photo02b.png", "photo10.png"]);
    }

    #[test]
    fn total_on_equivalent_names() {
        assert_eq!(natural_cmp("a01", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("A", "a"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }
}
