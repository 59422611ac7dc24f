//! Ordering primitives shared by the store: renumbering, shuffling and name collation.

use super::models::{AssignableItem, Section};
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Rewrite placement attributes so indices match positions (1..=n)
pub fn renumber(section_id: &str, items: &mut [AssignableItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.place(section_id, idx as u32 + 1);
    }
}

/// Uniform random permutation of the line-up, followed by renumbering
///
/// `SliceRandom::shuffle` is a Fisher–Yates shuffle, so every ordering of the
/// items is equally likely for a uniform `rng`.
pub fn shuffle<R: Rng + ?Sized>(section: &mut Section, rng: &mut R) {
    section.items.shuffle(rng);
    renumber(&section.content_id, &mut section.items);
}

/// Stable ascending sort by display name, followed by renumbering
pub fn seed(section: &mut Section) {
    section
        .items
        .sort_by(|a, b| compare_names(&a.name, &b.name));
    renumber(&section.content_id, &mut section.items);
}

/// Locale-aware name comparison
///
/// Names are compared on their base letters first (accents and case ignored,
/// so "Ánh" sits next to "Anh"), then with accents, then byte-wise so the
/// order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| a.trim().to_lowercase().cmp(&b.trim().to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn base_letters(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Bring a section received from the gateway into canonical order
///
/// Items are ordered by the index the server sent (items without one go last,
/// keeping their relative order) and then renumbered, so gaps or duplicates in
/// the payload never survive into the store.
pub fn normalize(section: &mut Section) {
    section
        .items
        .sort_by_key(|item| item.order_index.unwrap_or(u32::MAX));
    renumber(&section.content_id, &mut section.items);
}

/// Whether the order indices of a line-up are exactly 1..=n
pub fn is_contiguous(items: &[AssignableItem]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(idx, item)| item.order_index == Some(idx as u32 + 1))
}
