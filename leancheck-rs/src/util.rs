//! Support functions that don't belong anywhere else.

use fnv::FnvHasher;
use std::borrow::Cow;
use std::collections;
use std::hash::BuildHasherDefault;

/// Type alias for hashmaps to allow swapping out the implementation.
pub(crate) type HashMap<K, V> = collections::HashMap<K, V, BuildHasherDefault<FnvHasher>>;

/// Number of characters shown when previewing a diagnostic on the console.
/// The full text goes only to the error log.
pub(crate) const PREVIEW_LEN: usize = 200;

/// Truncates a diagnostic to [`PREVIEW_LEN`] characters for console
/// narration, appending an ellipsis when text was cut.
pub(crate) fn preview(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((ix, _)) => Cow::Owned(format!("{}...", &text[..ix])),
        None => Cow::Borrowed(text),
    }
}
