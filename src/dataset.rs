/// An item is the list of observation-feature IDs firing at one token
pub type Item = Vec<u32>;

/// A sequence of items together with their gold label IDs
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    /// Array of the item sequence
    pub items: Vec<Item>,
    /// Array of the label sequence
    ///
    /// Empty for sequences built for decoding.
    pub labels: Vec<u32>,
}

impl Sequence {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap),
            labels: Vec::with_capacity(cap),
        }
    }

    /// Append a labeled item
    pub fn push(&mut self, item: Item, label: u32) {
        self.items.push(item);
        self.labels.push(label);
    }

    /// Append an unlabeled item
    pub fn push_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Number of items in the sequence
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
