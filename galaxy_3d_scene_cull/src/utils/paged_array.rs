/// Grow-only result buffers backed by a shared page pool.
///
/// Every cull target (camera, cascade, shadow face, probe, SDFGI region)
/// appends into its own `PagedArray`. Pages come from a `PagedArrayPool`
/// shared by all arrays of a frame; `reset()` hands them back so steady-state
/// frames allocate nothing. The pool is behind a mutex because worker
/// threads culling different shadow faces draw pages concurrently.

use std::sync::{Arc, Mutex, PoisonError};

/// Shared pool of fixed-capacity pages.
pub struct PagedArrayPool<T> {
    page_size: usize,
    free_pages: Mutex<Vec<Vec<T>>>,
}

impl<T> PagedArrayPool<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            free_pages: Mutex::new(Vec::new()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages currently parked in the pool
    pub fn available_pages(&self) -> usize {
        self.free_pages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn alloc_page(&self) -> Vec<T> {
        let recycled = self.free_pages.lock().unwrap_or_else(PoisonError::into_inner).pop();
        recycled.unwrap_or_else(|| Vec::with_capacity(self.page_size))
    }

    fn free_pages(&self, pages: &mut Vec<Vec<T>>) {
        if pages.is_empty() {
            return;
        }
        for page in pages.iter_mut() {
            page.clear();
        }
        let mut free = self.free_pages.lock().unwrap_or_else(PoisonError::into_inner);
        free.append(pages);
    }
}

/// Append-only array split into pool pages.
pub struct PagedArray<T> {
    pool: Arc<PagedArrayPool<T>>,
    pages: Vec<Vec<T>>,
    len: usize,
}

impl<T> PagedArray<T> {
    pub fn new(pool: Arc<PagedArrayPool<T>>) -> Self {
        Self { pool, pages: Vec::new(), len: 0 }
    }

    pub fn push(&mut self, value: T) {
        let page_size = self.pool.page_size;
        let needs_page = self.pages.last().map_or(true, |page| page.len() >= page_size);
        if needs_page {
            let page = self.pool.alloc_page();
            self.pages.push(page);
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(value);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        let page_size = self.pool.page_size;
        self.pages.get(index / page_size).and_then(|page| page.get(index % page_size))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.pages.iter().flat_map(|page| page.iter())
    }

    /// Number of pages held by this array
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Drop all elements and return the pages to the pool.
    pub fn reset(&mut self) {
        self.pool.free_pages(&mut self.pages);
        self.len = 0;
    }
}

impl<T: Clone> PagedArray<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Drop for PagedArray<T> {
    fn drop(&mut self) {
        self.pool.free_pages(&mut self.pages);
    }
}

impl<T> std::fmt::Debug for PagedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedArray")
            .field("len", &self.len)
            .field("pages", &self.pages.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "paged_array_tests.rs"]
mod tests;
