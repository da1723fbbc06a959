use crate::models::Heading;

/// Read-only queries over the heading list of one block sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationIndex {
    headings: Vec<Heading>,
}

impl NavigationIndex {
    pub fn new(headings: Vec<Heading>) -> Self {
        Self { headings }
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Heading> {
        self.headings.get(index)
    }

    /// Position of the first heading carrying `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.headings.iter().position(|h| h.id == id)
    }

    /// Heading before `current_id`, clamped to the first heading.
    /// An unknown id is treated as the first heading.
    pub fn previous(&self, current_id: &str) -> Option<&Heading> {
        let index = self.position(current_id).unwrap_or(0);
        self.previous_index(index).and_then(|i| self.get(i))
    }

    /// Heading after `current_id`, clamped to the last heading.
    pub fn next(&self, current_id: &str) -> Option<&Heading> {
        let index = self.position(current_id).unwrap_or(0);
        self.next_index(index).and_then(|i| self.get(i))
    }

    pub fn previous_index(&self, index: usize) -> Option<usize> {
        if self.headings.is_empty() {
            return None;
        }
        Some(index.min(self.headings.len() - 1).saturating_sub(1))
    }

    pub fn next_index(&self, index: usize) -> Option<usize> {
        if self.headings.is_empty() {
            return None;
        }
        Some((index + 1).min(self.headings.len() - 1))
    }

    pub fn has_previous(&self, index: usize) -> bool {
        !self.headings.is_empty() && index > 0
    }

    pub fn has_next(&self, index: usize) -> bool {
        !self.headings.is_empty() && index + 1 < self.headings.len()
    }

    /// Exact lookup by chapter number, padded to the id format.
    pub fn find_by_number(&self, number: u32) -> Option<usize> {
        let id = format!("{:0>2}", number);
        self.position(&id)
    }

    /// Headings whose title contains `query`; a blank query matches all.
    pub fn filter(&self, query: &str) -> Vec<(usize, &Heading)> {
        let query = query.trim();
        self.headings
            .iter()
            .enumerate()
            .filter(|(_, h)| query.is_empty() || h.title.contains(query))
            .collect()
    }
}

/// Parse user input for a jump-by-number request. Non-numbers and zero are
/// rejected.
pub fn parse_chapter_number(input: &str) -> Option<u32> {
    match input.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}
