//! Find results and the single-pass cursor over them.
//!
//! A Find call produces a [`ResultCursor`]: the page of matching rows plus the `offset`
//! that was skipped and the `total_rows` that matched before pagination. The cursor is
//! consumed once and then discarded.
//!
//! # Example
//!
//! ```ignore
//! let mut cursor = store.find(request).await?;
//! println!("{} of {} matches", cursor.remaining(), cursor.total_rows());
//!
//! while let Some(row) = cursor.next_row() {
//!     println!("{} {}", row.id, row.rev);
//! }
//! assert_eq!(cursor.state(), CursorState::Exhausted);
//! ```

use serde::Serialize;
use std::collections::VecDeque;

use crate::revision::{Fields, RevisionId};

/// A single matching document: its ID, the winning revision and the (projected) fields.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub rev: RevisionId,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    pub fields: Fields,
}

/// Cursor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rows may remain.
    Ready,
    /// Every row has been read. Further reads report end-of-stream.
    Exhausted,
}

/// A lazy, single-pass sequence of Find results.
#[derive(Debug)]
pub struct ResultCursor {
    rows: VecDeque<Row>,
    offset: usize,
    total_rows: usize,
    state: CursorState,
}

impl ResultCursor {
    /// Creates a new builder for constructing a cursor over `rows`.
    pub fn builder(rows: Vec<Row>) -> ResultCursorBuilder {
        ResultCursorBuilder::new(rows)
    }

    /// Number of matches skipped before the first row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of matches before `skip` and `limit` were applied.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Reads the next row. `None` is the end-of-stream signal and is returned on every
    /// read once the cursor is exhausted.
    pub fn next_row(&mut self) -> Option<Row> {
        match self.state {
            CursorState::Exhausted => None,
            CursorState::Ready => {
                let row = self.rows.pop_front();
                if self.rows.is_empty() {
                    self.state = CursorState::Exhausted;
                }
                row
            }
        }
    }
}

impl Iterator for ResultCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.next_row()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}

/// Builder for [`ResultCursor`].
pub struct ResultCursorBuilder {
    rows: Vec<Row>,
    offset: usize,
    total_rows: usize,
}

impl ResultCursorBuilder {
    /// Creates a new builder with the given rows.
    pub fn new(rows: Vec<Row>) -> Self {
        let total_rows = rows.len();
        Self { rows, offset: 0, total_rows }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_total_rows(mut self, total_rows: usize) -> Self {
        self.total_rows = total_rows;
        self
    }

    /// Builds the cursor. A cursor without rows starts out exhausted.
    pub fn build(self) -> ResultCursor {
        let state = if self.rows.is_empty() {
            CursorState::Exhausted
        } else {
            CursorState::Ready
        };

        ResultCursor {
            rows: self.rows.into(),
            offset: self.offset,
            total_rows: self.total_rows,
            state,
        }
    }
}
