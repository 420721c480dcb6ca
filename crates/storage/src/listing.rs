// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newest-first views over published catalogs.

use crate::catalog::{Catalog, Entry};
use std::sync::Arc;

type Select<T> = fn(&Catalog) -> &[Entry<T>];

/// A finite, restartable, newest-first view of records.
///
/// Holds the catalogs that were published when the listing was taken, so
/// concurrent writes never affect it. Records are borrowed, not cloned;
/// call [`Listing::iter`] as often as needed.
pub struct Listing<T: 'static> {
    catalogs: Vec<Arc<Catalog>>,
    order: Vec<(usize, usize)>,
    select: Select<T>,
}

impl<T: 'static> Listing<T> {
    pub(crate) fn new(
        catalogs: Vec<Arc<Catalog>>,
        select: Select<T>,
        sort_key: fn(&T) -> u64,
    ) -> Self {
        let mut keyed: Vec<((u64, u64), (usize, usize))> = Vec::new();
        for (c, catalog) in catalogs.iter().enumerate() {
            for (i, entry) in select(catalog).iter().enumerate() {
                keyed.push(((sort_key(&entry.record), entry.seq), (c, i)));
            }
        }
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        let order = keyed.into_iter().map(|(_, pos)| pos).collect();
        Self { catalogs, order, select }
    }

    pub fn iter(&self) -> ListingIter<'_, T> {
        ListingIter { listing: self, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn get(&self, pos: usize) -> Option<&T> {
        let (c, i) = *self.order.get(pos)?;
        (self.select)(&self.catalogs[c]).get(i).map(|e| &e.record)
    }
}

pub struct ListingIter<'a, T: 'static> {
    listing: &'a Listing<T>,
    pos: usize,
}

impl<'a, T: 'static> Iterator for ListingIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.listing.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.listing.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl<T: 'static> ExactSizeIterator for ListingIter<'_, T> {}

impl<'a, T: 'static> IntoIterator for &'a Listing<T> {
    type Item = &'a T;
    type IntoIter = ListingIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
