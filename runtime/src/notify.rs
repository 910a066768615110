//! First-sighting notifications for interesting categories.

use crate::types::Category;
use std::sync::atomic::{AtomicBool, Ordering};

/// Told about every classified record. Must return quickly.
pub trait Notifier: Send + Sync {
    fn notify(&self, category: Category);
}

/// Fires a callback the first time each watched category is seen.
pub struct FirstSighting<F> {
    seen: [AtomicBool; Category::COUNT],
    callback: F,
}

/// Categories worth a flash on first sight.
pub const WATCHED: [Category; 6] = [
    Category::Secret,
    Category::Config,
    Category::Cloud,
    Category::Js,
    Category::Log,
    Category::Archive,
];

impl<F> FirstSighting<F>
where
    F: Fn(Category) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            seen: std::array::from_fn(|_| AtomicBool::new(false)),
            callback,
        }
    }
}

impl<F> Notifier for FirstSighting<F>
where
    F: Fn(Category) + Send + Sync,
{
    fn notify(&self, category: Category) {
        if !WATCHED.contains(&category) {
            return;
        }
        if !self.seen[category.index()].swap(true, Ordering::SeqCst) {
            (self.callback)(category);
        }
    }
}
