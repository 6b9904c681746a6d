//! Sparse ordered collections with explicit-index/span encoding
//!
//! Rows in a table, columns in a table and cells in a row all share one
//! storage scheme: elements are kept in position order, each carrying an
//! optional explicit 1-based index and a span (positions it occupies beyond
//! the first). An element without an index sits right after the previous
//! element's last position. Positions inside a gap read as blank.

use crate::error::{Error, Result};

/// An element stored in an [`IndexedList`]
pub trait Positioned: Clone {
    /// Whether a spanned element is a run of identical copies that may be
    /// split on access (rows, columns). Merged cells are not runs.
    const SPLITS: bool;

    /// Explicit 1-based index, if the element does not follow its predecessor
    fn index(&self) -> Option<u32>;

    /// Replace the explicit index
    fn set_index(&mut self, index: Option<u32>);

    /// Positions occupied beyond the first
    fn span(&self) -> u32;

    /// Replace the span
    fn set_span(&mut self, span: u32);

    /// A fresh element with no content
    fn blank() -> Self;
}

/// Ordered sparse list of [`Positioned`] elements
///
/// Start positions are cached beside the elements and element indices are
/// re-encoded after every mutation: explicit only when an element is not
/// contiguous with the one before it.
#[derive(Debug, Clone)]
pub struct IndexedList<T> {
    items: Vec<T>,
    starts: Vec<u32>,
}

impl<T> Default for IndexedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            starts: Vec::new(),
        }
    }
}

impl<T: Positioned> IndexedList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored elements (a run counts once)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no element is stored
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn end_of(&self, slot: usize) -> u32 {
        self.starts[slot] + self.items[slot].span()
    }

    /// Last occupied position (0 when empty)
    pub fn last_position(&self) -> u32 {
        match self.items.len() {
            0 => 0,
            n => self.end_of(n - 1),
        }
    }

    /// `Ok(slot)` for the element covering `pos`, `Err(slot)` for where an
    /// element at `pos` would be inserted
    fn locate(&self, pos: u32) -> std::result::Result<usize, usize> {
        let i = self.starts.partition_point(|&s| s <= pos);
        if i > 0 && pos <= self.end_of(i - 1) {
            Ok(i - 1)
        } else {
            Err(i)
        }
    }

    /// Element covering `pos` (a run or merge owner counts for all its positions)
    pub fn get(&self, pos: u32) -> Option<&T> {
        self.locate(pos).ok().map(|slot| &self.items[slot])
    }

    /// Element starting exactly at `pos`
    pub fn get_exact(&self, pos: u32) -> Option<&T> {
        match self.locate(pos) {
            Ok(slot) if self.starts[slot] == pos => Some(&self.items[slot]),
            _ => None,
        }
    }

    /// Mutable element covering `pos`; edits apply to the whole run
    pub fn get_mut(&mut self, pos: u32) -> Option<&mut T> {
        match self.locate(pos) {
            Ok(slot) => Some(&mut self.items[slot]),
            Err(_) => None,
        }
    }

    /// Start position of the element covering `pos`
    pub fn start_of(&self, pos: u32) -> Option<u32> {
        self.locate(pos).ok().map(|slot| self.starts[slot])
    }

    /// Iterate over `(start position, element)` in order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.starts.iter().copied().zip(self.items.iter())
    }

    /// Iterate mutably over `(start position, element)` in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.starts.iter().copied().zip(self.items.iter_mut())
    }

    /// Append an element, placing it by its explicit index or right after
    /// the last element; returns its position
    pub fn push(&mut self, item: T) -> Result<u32> {
        let prev_end = self.last_position();
        let pos = item.index().unwrap_or(prev_end + 1);
        if pos == 0 || pos <= prev_end {
            return Err(Error::IndexOutOfRange(pos));
        }
        self.items.push(item);
        self.starts.push(pos);
        let slot = self.items.len() - 1;
        self.encode_slot(slot, prev_end);
        Ok(pos)
    }

    /// Element at `pos`, splitting a run or creating a blank in a gap
    pub fn get_or_create(&mut self, pos: u32) -> &mut T {
        let slot = match self.locate(pos) {
            Ok(slot) if T::SPLITS => self.split_out(slot, pos),
            Ok(slot) => slot,
            Err(slot) => {
                self.items.insert(slot, T::blank());
                self.starts.insert(slot, pos);
                self.reencode();
                slot
            }
        };
        &mut self.items[slot]
    }

    /// Split the run in `slot` so that `pos` is a single element; returns its slot
    fn split_out(&mut self, slot: usize, pos: u32) -> usize {
        let start = self.starts[slot];
        let end = self.end_of(slot);
        if start == end {
            return slot;
        }

        let template = self.items[slot].clone();
        let mut pieces = Vec::with_capacity(3);
        if pos > start {
            let mut head = template.clone();
            head.set_span(pos - start - 1);
            pieces.push((start, head));
        }
        let middle = pieces.len();
        let mut single = template.clone();
        single.set_span(0);
        pieces.push((pos, single));
        if pos < end {
            let mut tail = template;
            tail.set_span(end - pos - 1);
            pieces.push((pos + 1, tail));
        }

        let (starts, items): (Vec<u32>, Vec<T>) = pieces.into_iter().unzip();
        self.starts.splice(slot..=slot, starts);
        self.items.splice(slot..=slot, items);
        self.reencode();
        slot + middle
    }

    /// Put `item` at `pos`, replacing whatever starts there
    ///
    /// Fails when the item (with its span) would overlap a neighbour.
    pub fn set(&mut self, pos: u32, item: T) -> Result<()> {
        if pos == 0 {
            return Err(Error::IndexOutOfRange(pos));
        }
        let end = pos + item.span();
        let next_start = |list: &Self, slot: usize| list.starts.get(slot).copied();
        match self.locate(pos) {
            Ok(slot) => {
                let slot = if self.starts[slot] == pos {
                    slot
                } else if T::SPLITS {
                    self.split_out(slot, pos)
                } else {
                    return Err(Error::IndexOutOfRange(pos));
                };
                if next_start(self, slot + 1).is_some_and(|next| next <= end) {
                    return Err(Error::IndexOutOfRange(end));
                }
                self.items[slot] = item;
            }
            Err(slot) => {
                if next_start(self, slot).is_some_and(|next| next <= end) {
                    return Err(Error::IndexOutOfRange(end));
                }
                self.items.insert(slot, item);
                self.starts.insert(slot, pos);
            }
        }
        self.reencode();
        Ok(())
    }

    /// Remove the element starting at `pos` without shifting its successors
    pub fn remove(&mut self, pos: u32) -> Option<T> {
        let slot = match self.locate(pos) {
            Ok(slot) if self.starts[slot] == pos => slot,
            Ok(slot) if T::SPLITS => self.split_out(slot, pos),
            _ => return None,
        };
        self.starts.remove(slot);
        let item = self.items.remove(slot);
        self.reencode();
        Some(item)
    }

    /// Open a gap of `count` positions at `pos`
    ///
    /// A run straddling `pos` is split; a non-run element straddling `pos`
    /// (a merged cell) grows by `count` instead.
    pub fn shift(&mut self, pos: u32, count: u32) {
        if count == 0 {
            return;
        }
        if let Ok(slot) = self.locate(pos) {
            if self.starts[slot] < pos {
                if T::SPLITS {
                    self.split_out(slot, pos);
                } else {
                    let span = self.items[slot].span();
                    self.items[slot].set_span(span + count);
                }
            }
        }
        for start in self.starts.iter_mut().filter(|s| **s >= pos) {
            *start += count;
        }
        self.reencode();
    }

    /// Insert `item` at `pos`, shifting every element at or after `pos`
    /// right by the item's width
    pub fn insert(&mut self, pos: u32, item: T) -> Result<()> {
        if pos == 0 {
            return Err(Error::IndexOutOfRange(pos));
        }
        if let Ok(slot) = self.locate(pos) {
            if !T::SPLITS && self.starts[slot] < pos {
                return Err(Error::IndexOutOfRange(pos));
            }
        }
        self.shift(pos, item.span() + 1);
        match self.locate(pos) {
            Err(slot) => {
                self.items.insert(slot, item);
                self.starts.insert(slot, pos);
                self.reencode();
                Ok(())
            }
            Ok(_) => Err(Error::IndexOutOfRange(pos)),
        }
    }

    /// Delete position `pos`, shifting every later element left by one
    ///
    /// A spanned element covering `pos` loses one position of span; a
    /// single element is removed.
    pub fn delete(&mut self, pos: u32) {
        if let Ok(slot) = self.locate(pos) {
            let span = self.items[slot].span();
            if span > 0 {
                self.items[slot].set_span(span - 1);
            } else {
                self.starts.remove(slot);
                self.items.remove(slot);
            }
        }
        for start in self.starts.iter_mut().filter(|s| **s > pos) {
            *start -= 1;
        }
        self.reencode();
    }

    /// Drop everything beyond `max`, clipping a spanned element that crosses it
    ///
    /// Returns the number of elements dropped.
    pub fn truncate(&mut self, max: u32) -> usize {
        let keep = self.starts.partition_point(|&s| s <= max);
        let dropped = self.items.len() - keep;
        self.items.truncate(keep);
        self.starts.truncate(keep);
        if let Some(slot) = keep.checked_sub(1) {
            if self.end_of(slot) > max {
                let clipped = max - self.starts[slot];
                self.items[slot].set_span(clipped);
            }
        }
        dropped
    }

    fn encode_slot(&mut self, slot: usize, prev_end: u32) {
        let start = self.starts[slot];
        let index = if start == prev_end + 1 {
            None
        } else {
            Some(start)
        };
        self.items[slot].set_index(index);
    }

    fn reencode(&mut self) {
        let mut prev_end = 0;
        for slot in 0..self.items.len() {
            self.encode_slot(slot, prev_end);
            prev_end = self.end_of(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Run {
        index: Option<u32>,
        span: u32,
        tag: &'static str,
    }

    impl Positioned for Run {
        const SPLITS: bool = true;
        fn index(&self) -> Option<u32> {
            self.index
        }
        fn set_index(&mut self, index: Option<u32>) {
            self.index = index;
        }
        fn span(&self) -> u32 {
            self.span
        }
        fn set_span(&mut self, span: u32) {
            self.span = span;
        }
        fn blank() -> Self {
            Run {
                index: None,
                span: 0,
                tag: "",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Merged {
        index: Option<u32>,
        across: u32,
    }

    impl Positioned for Merged {
        const SPLITS: bool = false;
        fn index(&self) -> Option<u32> {
            self.index
        }
        fn set_index(&mut self, index: Option<u32>) {
            self.index = index;
        }
        fn span(&self) -> u32 {
            self.across
        }
        fn set_span(&mut self, span: u32) {
            self.across = span;
        }
        fn blank() -> Self {
            Merged {
                index: None,
                across: 0,
            }
        }
    }

    fn run(tag: &'static str, span: u32) -> Run {
        Run {
            index: None,
            span,
            tag,
        }
    }

    fn layout<T: Positioned>(list: &IndexedList<T>) -> Vec<(u32, Option<u32>, u32)> {
        list.iter().map(|(p, t)| (p, t.index(), t.span())).collect()
    }

    #[test]
    fn test_gap_is_encoded_with_explicit_index() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.get_or_create(1).tag = "a";
        list.get_or_create(2).tag = "b";
        list.get_or_create(5).tag = "c";

        assert_eq!(layout(&list), vec![(1, None, 0), (2, None, 0), (5, Some(5), 0)]);
        assert!(list.get(3).is_none());
        assert!(list.get(4).is_none());
        assert_eq!(list.last_position(), 5);
    }

    #[test]
    fn test_push_rejects_non_monotonic_index() {
        let mut list: IndexedList<Run> = IndexedList::new();
        assert_eq!(list.push(run("a", 2)).ok(), Some(1));
        let mut late = run("b", 0);
        late.index = Some(3);
        assert!(list.push(late).is_err());
        let mut ok = run("c", 0);
        ok.index = Some(7);
        assert_eq!(list.push(ok).ok(), Some(7));
        assert_eq!(list.push(run("d", 0)).ok(), Some(8));
    }

    #[test]
    fn test_get_or_create_splits_run() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.push(run("x", 4)).ok();

        list.get_or_create(3).tag = "y";

        assert_eq!(layout(&list), vec![(1, None, 1), (3, None, 0), (4, None, 1)]);
        assert_eq!(list.get(2).map(|r| r.tag), Some("x"));
        assert_eq!(list.get(3).map(|r| r.tag), Some("y"));
        assert_eq!(list.get(5).map(|r| r.tag), Some("x"));
    }

    #[test]
    fn test_delete_shifts_left() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.get_or_create(1).tag = "a";
        list.get_or_create(3).tag = "b";
        list.get_or_create(4).tag = "c";

        list.delete(1);
        assert_eq!(layout(&list), vec![(2, Some(2), 0), (3, None, 0)]);

        list.delete(1);
        assert_eq!(layout(&list), vec![(1, None, 0), (2, None, 0)]);
        assert_eq!(list.get(1).map(|r| r.tag), Some("b"));
    }

    #[test]
    fn test_delete_inside_run_shortens_it() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.push(run("x", 2)).ok();
        list.get_or_create(5).tag = "y";

        list.delete(2);
        assert_eq!(layout(&list), vec![(1, None, 1), (4, Some(4), 0)]);
    }

    #[test]
    fn test_insert_shifts_right_by_width() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.get_or_create(1).tag = "a";
        list.get_or_create(2).tag = "b";

        list.insert(2, run("new", 1)).ok();
        assert_eq!(
            list.iter().map(|(p, r)| (p, r.tag)).collect::<Vec<_>>(),
            vec![(1, "a"), (2, "new"), (4, "b")]
        );
        assert_eq!(layout(&list), vec![(1, None, 0), (2, None, 1), (4, None, 0)]);
    }

    #[test]
    fn test_merged_element_grows_instead_of_splitting() {
        let mut list: IndexedList<Merged> = IndexedList::new();
        list.set(2, Merged { index: None, across: 2 }).ok();
        list.get_or_create(6);

        list.shift(3, 2);
        assert_eq!(layout(&list), vec![(2, Some(2), 4), (8, Some(8), 0)]);

        assert!(list.insert(4, Merged::blank()).is_err());

        list.delete(2);
        assert_eq!(layout(&list), vec![(2, Some(2), 3), (7, Some(7), 0)]);
    }

    #[test]
    fn test_set_rejects_overlap() {
        let mut list: IndexedList<Merged> = IndexedList::new();
        list.get_or_create(4);
        assert!(list.set(2, Merged { index: None, across: 2 }).is_err());
        assert!(list.set(2, Merged { index: None, across: 1 }).is_ok());
        assert_eq!(list.get(3).map(|m| m.across), Some(1));
        assert!(list.get_exact(3).is_none());
    }

    #[test]
    fn test_truncate_clips_last_run() {
        let mut list: IndexedList<Run> = IndexedList::new();
        list.push(run("x", 9)).ok();
        list.get_or_create(20);
        assert_eq!(list.truncate(6), 1);
        assert_eq!(layout(&list), vec![(1, None, 5)]);
    }
}
