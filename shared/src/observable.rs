//! Observable collection
//!
//! An owned `Vec<T>` that reports every mutation to an explicit list of
//! observers. Display layers subscribe to keep their own views in step with
//! the floor service without polling.
//!
//! ```text
//! ObservableVec<T>
//!   ├── push / insert ──► Inserted { index, item }
//!   ├── remove ─────────► Removed  { index, item }
//!   ├── update ─────────► Updated  { index, item }
//!   └── clear ──────────► Reset
//! ```
//!
//! Observers run synchronously on the thread performing the mutation.

use std::fmt;

/// A single mutation of an [`ObservableVec`]
#[derive(Debug, PartialEq)]
pub enum CollectionChange<'a, T> {
    Inserted { index: usize, item: &'a T },
    Removed { index: usize, item: &'a T },
    /// Item at `index` was modified in place
    Updated { index: usize, item: &'a T },
    /// All items were removed
    Reset,
}

/// Handle returned by [`ObservableVec::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer<T> = Box<dyn Fn(&CollectionChange<'_, T>) + Send>;

pub struct ObservableVec<T> {
    items: Vec<T>,
    observers: Vec<(ObserverId, Observer<T>)>,
    next_observer: u64,
}

impl<T> ObservableVec<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    /// Register an observer for all subsequent mutations
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&CollectionChange<'_, T>) + Send + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the observer was not registered
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn emit(&self, change: CollectionChange<'_, T>) {
        for (_, observer) in &self.observers {
            observer(&change);
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        let index = self.items.len() - 1;
        self.emit(CollectionChange::Inserted {
            index,
            item: &self.items[index],
        });
    }

    /// Panics if `index > len`, like `Vec::insert`
    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
        self.emit(CollectionChange::Inserted {
            index,
            item: &self.items[index],
        });
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.emit(CollectionChange::Removed { index, item: &item });
        Some(item)
    }

    /// Mutate the item at `index` in place and notify observers
    pub fn update<R>(&mut self, index: usize, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = f(self.items.get_mut(index)?);
        self.emit(CollectionChange::Updated {
            index,
            item: &self.items[index],
        });
        Some(result)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.emit(CollectionChange::Reset);
    }

    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<&T> {
        self.items.iter().find(|item| predicate(item))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableVec")
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a ObservableVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
