// Two-list triage state: unsorted rows on one side, approved rows on the other
// Rows change lists by ownership transfer; they are never copied between lists.

use crate::error::{Result, TriageError};
use crate::rows::{DisplayWidths, Row, RowList};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Unsorted -> approved, approved list re-sorted by date
    ToApproved,
    /// Approved -> unsorted, appended in selection order
    ToUnapproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListId {
    Unsorted,
    Approved,
}

/// A user action reported by the display shell, applied to a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    ChangeCategory(String),
}

#[derive(Debug, Clone)]
pub struct Triage {
    unsorted: RowList,
    approved: RowList,
    widths: DisplayWidths,
}

impl Triage {
    /// Start a session from an ingested unsorted list; approved starts empty
    pub fn new(unsorted: RowList, widths: DisplayWidths) -> Self {
        Triage {
            unsorted,
            approved: RowList::new(),
            widths,
        }
    }

    pub fn unsorted(&self) -> &RowList {
        &self.unsorted
    }

    pub fn approved(&self) -> &RowList {
        &self.approved
    }

    pub fn list(&self, id: ListId) -> &RowList {
        match id {
            ListId::Unsorted => &self.unsorted,
            ListId::Approved => &self.approved,
        }
    }

    pub fn widths(&self) -> DisplayWidths {
        self.widths
    }

    /// Rendered fixed-width lines of one list, for the shell
    pub fn rendered(&self, id: ListId) -> Vec<String> {
        self.list(id).render_lines(self.widths)
    }

    /// The list a command's selection indices refer to
    pub fn source_of(command: &Command) -> ListId {
        match command {
            Command::Move(Direction::ToApproved) => ListId::Unsorted,
            Command::Move(Direction::ToUnapproved) => ListId::Approved,
            Command::ChangeCategory(_) => ListId::Approved,
        }
    }

    /// Apply a shell command to `selected`; returns the number of rows affected
    pub fn apply(&mut self, command: &Command, selected: &[usize]) -> Result<usize> {
        match command {
            Command::Move(direction) => self.move_rows(selected, *direction),
            Command::ChangeCategory(category) => self.change_category(selected, category),
        }
    }

    /// Move the selected rows of the source list to the other list.
    ///
    /// Sentinel rows in the selection stay where they are. Out-of-range indices
    /// fail the call before anything is changed. Returns the number moved.
    pub fn move_rows(&mut self, selected: &[usize], direction: Direction) -> Result<usize> {
        let (source, dest) = match direction {
            Direction::ToApproved => (&mut self.unsorted, &mut self.approved),
            Direction::ToUnapproved => (&mut self.approved, &mut self.unsorted),
        };

        let allowed = movable_indices(source, selected)?;

        dest.strip_trailing_blank();

        // remove from the back so earlier indices stay valid
        let mut moved: Vec<Row> = allowed
            .iter()
            .rev()
            .map(|&i| source.rows_mut().remove(i))
            .collect();
        moved.reverse();
        let count = moved.len();
        dest.rows_mut().extend(moved);

        if direction == Direction::ToApproved {
            dest.rows_mut()
                .sort_by_key(|row| row.as_data().map(|data| data.date()));
        }

        dest.push(Row::Blank);

        debug!(?direction, requested = selected.len(), moved = count, "moved rows");
        Ok(count)
    }

    /// Move every data row of the unsorted list to approved
    pub fn approve_all(&mut self) -> Result<usize> {
        let all: Vec<usize> = (0..self.unsorted.len()).collect();
        self.move_rows(&all, Direction::ToApproved)
    }

    /// Set the category of the selected approved rows.
    ///
    /// Rows already in `category` are left byte-identical. Returns the number
    /// of rows rewritten.
    pub fn change_category(&mut self, selected: &[usize], category: &str) -> Result<usize> {
        let indices = checked_indices(&self.approved, selected)?;
        let cat_len = self.widths.cat_len;

        let mut changed = 0;
        for i in indices {
            if let Some(row) = self.approved.rows_mut()[i].as_data_mut() {
                if row.set_category(category, cat_len) {
                    changed += 1;
                }
            }
        }

        debug!(category, changed, "changed category");
        Ok(changed)
    }
}

/// Deduplicated, ascending, bounds-checked selection
fn checked_indices(list: &RowList, selected: &[usize]) -> Result<BTreeSet<usize>> {
    let len = list.len();
    if let Some(&index) = selected.iter().find(|&&i| i >= len) {
        return Err(TriageError::InvalidSelection { index, len });
    }
    Ok(selected.iter().copied().collect())
}

fn movable_indices(list: &RowList, selected: &[usize]) -> Result<Vec<usize>> {
    Ok(checked_indices(list, selected)?
        .into_iter()
        .filter(|&i| !list[i].is_sentinel())
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
