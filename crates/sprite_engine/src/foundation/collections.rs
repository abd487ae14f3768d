//! Specialized collection types
//!
//! [`LinkedList`] is the per-layer container of the scene. It keeps its nodes
//! in a slot map so links are stable keys rather than pointers, and it tracks
//! the position of every running [`LinkedList::each`] traversal so that the
//! visitor may unlink any node (including the one being visited) without the
//! walk skipping or revisiting anything.

use slotmap::{new_key_type, SlotMap};
use std::fmt;

new_key_type! {
    /// Stable key of a list node
    struct NodeKey;
}

struct Node<T> {
    item: T,
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
}

/// Doubly linked list with traversal-safe removal and an in-place stable sort
pub struct LinkedList<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
    /// Pending next node of every active `each`, innermost last
    cursors: Vec<Option<NodeKey>>,
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone> Clone for LinkedList<T> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<T> LinkedList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
            cursors: Vec::new(),
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the list holds no items
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First item
    pub fn first(&self) -> Option<&T> {
        self.head.map(|key| &self.nodes[key].item)
    }

    /// Last item
    pub fn last(&self) -> Option<&T> {
        self.tail.map(|key| &self.nodes[key].item)
    }

    /// Append an item in O(1)
    pub fn push(&mut self, item: T) {
        let key = self.nodes.insert(Node {
            item,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
    }

    /// Item at `index`, or `None` past the end
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.iter().nth(index)
    }

    /// Insert an item so it ends up at `index`
    ///
    /// Indices at or past the end append.
    pub fn insert_at(&mut self, index: usize, item: T) {
        match self.key_at(index) {
            Some(before) => self.insert_before(item, before),
            None => self.push(item),
        }
    }

    /// Visit every item in order
    ///
    /// The visitor receives the list itself and may remove any item,
    /// including the current one; removed items that have not been visited
    /// yet are skipped and nothing is visited twice. Items pushed while the
    /// walk is on the tail are not visited.
    pub fn each<F>(&mut self, mut visit: F)
    where
        T: Clone,
        F: FnMut(&mut Self, T),
    {
        let depth = self.cursors.len();
        let mut current = self.head;
        self.cursors.push(None);

        while let Some(key) = current {
            let Some(node) = self.nodes.get(key) else {
                break;
            };
            self.cursors[depth] = node.next;
            let item = node.item.clone();

            visit(self, item);

            current = self.cursors[depth];
        }

        self.cursors.truncate(depth);
    }

    /// Iterate over the items in order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.head,
            remaining: self.len(),
        }
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        for cursor in &mut self.cursors {
            *cursor = None;
        }
    }

    /// Sort in place so that no item is `less` than its predecessor
    ///
    /// A single walk from the second node: whenever the walked node is `less`
    /// than the comparison node it is unlinked and re-inserted just before
    /// it, and the comparison restarts at the head. Items that compare equal
    /// keep their relative order. Worst case O(n²), no extra storage.
    pub fn sort<F>(&mut self, mut less: F)
    where
        F: FnMut(&T, &T) -> bool,
    {
        if self.len() < 2 {
            return;
        }

        let mut node = self.head.and_then(|head| self.nodes[head].next);
        let mut compare = self.head;

        while let (Some(n), Some(c)) = (node, compare) {
            let next = self.nodes[n].next;

            if less(&self.nodes[n].item, &self.nodes[c].item) {
                self.detach(n);
                self.attach_before(n, c);

                node = next;
                compare = self.head;
            } else {
                compare = self.nodes[c].next;
                if compare == node {
                    node = next;
                    compare = self.head;
                }
            }
        }
    }

    fn key_at(&self, index: usize) -> Option<NodeKey> {
        let mut current = self.head;
        for _ in 0..index {
            current = self.nodes[current?].next;
        }
        current
    }

    fn insert_before(&mut self, item: T, before: NodeKey) {
        let key = self.nodes.insert(Node {
            item,
            prev: None,
            next: None,
        });
        self.attach_before(key, before);
    }

    /// Unlink a node from its neighbours, keeping it in storage
    fn detach(&mut self, key: NodeKey) {
        let (prev, next) = {
            let node = &self.nodes[key];
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.nodes[key];
        node.prev = None;
        node.next = None;
    }

    /// Link a detached node in front of `before`
    fn attach_before(&mut self, key: NodeKey, before: NodeKey) {
        let prev = self.nodes[before].prev;
        {
            let node = &mut self.nodes[key];
            node.prev = prev;
            node.next = Some(before);
        }
        self.nodes[before].prev = Some(key);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(key),
            None => self.head = Some(key),
        }
    }

    fn unlink(&mut self, key: NodeKey) -> Option<T> {
        let next = self.nodes.get(key)?.next;
        for cursor in &mut self.cursors {
            if *cursor == Some(key) {
                *cursor = next;
            }
        }
        self.detach(key);
        self.nodes.remove(key).map(|node| node.item)
    }
}

impl<T: PartialEq> LinkedList<T> {
    /// Remove the first item equal to `item`
    ///
    /// O(n). Returns the removed item, or `None` when nothing matched.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let key = self.find(item)?;
        self.unlink(key)
    }

    /// Whether an equal item is in the list
    pub fn contains(&self, item: &T) -> bool {
        self.find(item).is_some()
    }

    fn find(&self, item: &T) -> Option<NodeKey> {
        let mut current = self.head;
        while let Some(key) = current {
            let node = &self.nodes[key];
            if node.item == *item {
                return Some(key);
            }
            current = node.next;
        }
        None
    }
}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

impl<T> Extend<T> for LinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

/// Borrowing iterator over a [`LinkedList`]
pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    next: Option<NodeKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.nodes.get(self.next?)?;
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
