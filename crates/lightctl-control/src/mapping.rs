//! Fader position to DMX channel mapping
//!
//! The touch surface is laid out as pages of 7 rows by 6 columns. Each page
//! covers 42 consecutive DMX channels, filled row by row:
//!
//! ```text
//! channel = (page - 1) * 42 + (row - 1) * 6 + column
//! ```

use serde::{Deserialize, Serialize};

use crate::{error::ControlError, Result};

/// Number of pages on the touch surface
pub const PAGES: u16 = 2;
/// Faders per row
pub const COLUMNS: u16 = 6;
/// Rows per page
pub const ROWS: u16 = 7;
/// Channels covered by a single page
pub const CHANNELS_PER_PAGE: u16 = COLUMNS * ROWS;
/// Highest channel reachable through a fader
pub const MAX_FADER_CHANNEL: u16 = PAGES * CHANNELS_PER_PAGE;

/// A fader on the touch surface, all coordinates 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaderPosition {
    pub page: u16,
    pub column: u16,
    pub row: u16,
}

impl FaderPosition {
    /// Create a fader position, rejecting coordinates outside the surface
    pub fn new(page: u16, column: u16, row: u16) -> Result<Self> {
        if !(1..=PAGES).contains(&page) {
            return Err(ControlError::InvalidParameter(format!(
                "page {} out of range 1-{}",
                page, PAGES
            )));
        }
        if !(1..=COLUMNS).contains(&column) {
            return Err(ControlError::InvalidParameter(format!(
                "column {} out of range 1-{}",
                column, COLUMNS
            )));
        }
        if !(1..=ROWS).contains(&row) {
            return Err(ControlError::InvalidParameter(format!(
                "row {} out of range 1-{}",
                row, ROWS
            )));
        }
        Ok(Self { page, column, row })
    }

    /// The 1-based DMX channel driven by this fader
    pub fn channel(&self) -> u16 {
        channel_of(self.page, self.column, self.row)
    }

    /// Iterate every fader of a page, column-major (rows vary fastest)
    pub fn page_faders(page: u16) -> impl Iterator<Item = FaderPosition> {
        (1..=COLUMNS)
            .flat_map(move |column| (1..=ROWS).map(move |row| FaderPosition { page, column, row }))
    }

    /// Iterate every fader of the surface, page by page
    pub fn all() -> impl Iterator<Item = FaderPosition> {
        (1..=PAGES).flat_map(Self::page_faders)
    }
}

/// Map page/column/row to a 1-based DMX channel.
///
/// Callers are expected to pass coordinates inside the surface; see
/// [`FaderPosition::new`] for the checked constructor.
///
/// # Panics
///
/// Debug builds panic when `page` or `row` is 0.
pub fn channel_of(page: u16, column: u16, row: u16) -> u16 {
    debug_assert!(
        page >= 1 && row >= 1,
        "fader coordinates are 1-based (page {}, row {})",
        page,
        row
    );
    (page - 1) * CHANNELS_PER_PAGE + (row - 1) * COLUMNS + column
}

/// Inverse of [`channel_of`] for channels reachable by a fader
pub fn position_of(channel: u16) -> Option<FaderPosition> {
    if channel == 0 || channel > MAX_FADER_CHANNEL {
        return None;
    }

    let offset = channel - 1;
    let page = offset / CHANNELS_PER_PAGE + 1;
    let within_page = offset % CHANNELS_PER_PAGE;

    Some(FaderPosition {
        page,
        column: within_page % COLUMNS + 1,
        row: within_page / COLUMNS + 1,
    })
}
