use tracing::warn;

/// A list entry pairing a value with its label and selection flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem<T> {
    pub selected: bool,
    pub label: String,
    pub value: T,
}

impl<T> SelectionItem<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            selected: false,
            label: label.into(),
            value,
        }
    }
}

/// Backing collection of the selection dialog.
///
/// At most one item is selected at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionList<T> {
    items: Vec<SelectionItem<T>>,
}

impl<T> Default for SelectionList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> SelectionList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents; keeps at most the first selected item
    pub fn configure(&mut self, items: Vec<SelectionItem<T>>) {
        let mut seen = false;
        self.items = items
            .into_iter()
            .map(|mut item| {
                item.selected = item.selected && !seen;
                seen |= item.selected;
                item
            })
            .collect();
    }

    /// Toggle the item at `index`, clearing any other selection.
    ///
    /// Returns false when `index` is out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            warn!("Ignoring selection of position {} in a list of {}", index + 1, self.items.len());
            return false;
        }

        let select = !self.items[index].selected;
        for (i, item) in self.items.iter_mut().enumerate() {
            item.selected = i == index && select;
        }
        true
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.items.iter().position(|item| item.selected)
    }

    pub fn selected(&self) -> Option<&SelectionItem<T>> {
        self.items.iter().find(|item| item.selected)
    }

    pub fn items(&self) -> &[SelectionItem<T>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
