/// Selected item shared between the list and the map view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    pub fn select(&mut self, entity_id: Option<String>) {
        self.selected = entity_id;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Clear the selection if the selected item is no longer listed
    pub fn retain(&mut self, is_listed: impl Fn(&str) -> bool) {
        if self.selected.as_deref().map_or(false, |id| !is_listed(id)) {
            self.selected = None;
        }
    }
}
