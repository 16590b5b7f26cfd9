// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Cow;

/// Ordered (corrupted, corrected) pairs. Applied top to bottom; the order
/// is significant because several patterns share a prefix.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã ", "à"),
    ("Ã¢", "â"),
    ("Ã§", "ç"),
    ("Ã´", "ô"),
    ("Ã®", "î"),
    ("Ã¯", "ï"),
    ("Ã«", "ë"),
    ("Ã¹", "ù"),
    ("Ã»", "û"),
    ("Ã¼", "ü"),
    ("Ã¶", "ö"),
    ("Ã±", "ñ"),
    ("Ã€", "À"),
    ("Ã‰", "É"),
    ("ÃŠ", "Ê"),
    ("Ã‡", "Ç"),
    ("Å\"", "œ"),
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€", "\""),
    // The next two never fire: the bare prefix above consumes them first.
    ("â€\"", "—"),
    ("â€¦", "..."),
    ("Â ", " "),
    ("nÂ°", "n°"),
];

/// Run every substitution once, in table order. Returns `None` when no
/// pattern matched.
fn apply_once(text: &str) -> Option<String> {
    let mut changed: Option<String> = None;

    for &(bad, good) in SUBSTITUTIONS {
        let current = changed.as_deref().unwrap_or(text);
        if current.contains(bad) {
            changed = Some(current.replace(bad, good));
        }
    }

    changed
}

/// Repair mojibake in `text`.
///
/// Passes over the table are repeated until one changes nothing, so the
/// result is stable under a second repair. Every rule that can fire
/// shortens the string, which bounds the number of passes. Text without
/// any corrupted pattern is returned borrowed.
pub fn repair(text: &str) -> Cow<'_, str> {
    let Some(mut repaired) = apply_once(text) else {
        return Cow::Borrowed(text);
    };

    while let Some(next) = apply_once(&repaired) {
        repaired = next;
    }

    Cow::Owned(repaired)
}

/// Repair a string in place, handing back the previous value if it changed.
pub fn repair_in_place(text: &mut String) -> Option<String> {
    let fixed = match repair(text) {
        Cow::Borrowed(_) => return None,
        Cow::Owned(fixed) => fixed,
    };
    Some(std::mem::replace(text, fixed))
}

/// Number of distinct table patterns present in `text`.
pub fn count_patterns(text: &str) -> usize {
    SUBSTITUTIONS
        .iter()
        .filter(|(bad, _)| text.contains(bad))
        .count()
}
