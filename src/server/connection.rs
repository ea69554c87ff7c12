use std::net::TcpStream;

use crate::http::parser::RequestParser;

/// One occupied slot: the socket, the application's per-connection value
/// and the accumulator for the exchange in progress, if any.
pub(crate) struct Connection<C> {
    pub(crate) stream: TcpStream,
    pub(crate) context: C,
    pub(crate) request: Option<RequestParser>,
}

impl<C> Connection<C> {
    pub(crate) fn new(stream: TcpStream, context: C) -> Self {
        Self {
            stream,
            context,
            request: None,
        }
    }
}

/// Fixed-capacity slot arena.
///
/// Slots are allocated once and reused; `insert` takes the lowest free index.
/// The table never grows past the capacity it was created with.
#[derive(Debug)]
pub(crate) struct ConnectionTable<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> ConnectionTable<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, live: 0 }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn is_full(&self) -> bool {
        self.live >= self.slots.len()
    }

    /// First free slot, scanning from the start.
    pub(crate) fn vacant(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Places `value` in the first free slot, or hands it back when full.
    pub(crate) fn insert(&mut self, value: T) -> Result<usize, T> {
        match self.vacant() {
            Some(index) => {
                self.slots[index] = Some(value);
                self.live += 1;
                Ok(index)
            }
            None => Err(value),
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Frees the slot. Returns `None` if it was already free.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        self.live -= 1;
        Some(value)
    }

    /// Indices of occupied slots, in table order.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }
}
