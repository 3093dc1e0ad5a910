//! Extraction of the portal's reservation list table.
//!
//! The portal renders reservations as
//!
//! ```text
//! | Your Reservations (colspan=2)        | Activity       | ... |
//! | Sat, Oct 05, 2024 | 8:00 AM - 9:30 AM | Tennis Court 4 | ... |
//! ```
//!
//! so the first "Your Reservations" column holds the date and the second one the time range.

use crate::error::{parse_error, BookingResult};
use crate::models::ReservationRow;
use scraper::{ElementRef, Html, Selector};

const RESERVATIONS_HEADER: &str = "your reservations";
const ACTIVITY_HEADER: &str = "activity";

/// Largest `colspan` honoured, the same cap browsers apply
const MAX_COLSPAN: usize = 1000;

/// Column positions of the fields we care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    date: usize,
    time_range: usize,
    activity: usize,
}

impl Columns {
    fn width(&self) -> usize {
        self.date.max(self.time_range).max(self.activity) + 1
    }
}

fn selector(css: &str) -> BookingResult<Selector> {
    Selector::parse(css).map_err(|e| parse_error(&format!("Invalid selector '{}': {:?}", css, e)))
}

/// Collapse all whitespace inside a cell into single spaces
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn colspan(cell: &ElementRef<'_>) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map_or(1, |n| n.min(MAX_COLSPAN))
}

/// Cell texts of a row with `colspan` cells repeated across the columns they cover
fn expand_cells<'a>(cells: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    let mut expanded = Vec::new();
    for cell in cells {
        let text = cell_text(&cell);
        for _ in 0..colspan(&cell) {
            expanded.push(text.clone());
        }
    }
    expanded
}

fn resolve_columns(headers: &[String]) -> BookingResult<Columns> {
    let mut reservation_columns = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.eq_ignore_ascii_case(RESERVATIONS_HEADER))
        .map(|(i, _)| i);

    let date = reservation_columns
        .next()
        .ok_or_else(|| parse_error("Reservation table has no 'Your Reservations' column"))?;
    let time_range = reservation_columns
        .next()
        .ok_or_else(|| parse_error("Reservation table has no time range column"))?;
    let activity = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(ACTIVITY_HEADER))
        .ok_or_else(|| parse_error("Reservation table has no 'Activity' column"))?;

    Ok(Columns {
        date,
        time_range,
        activity,
    })
}

/// Parse the reservation table markup into rows, in table order.
///
/// Either every row is returned or an error is; a table without data rows is empty, not an error.
pub fn parse_reservation_table(html: &str) -> BookingResult<Vec<ReservationRow>> {
    let document = Html::parse_fragment(html);

    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| parse_error("No reservation table found in markup"))?;

    let mut rows = table.select(&row_sel);

    // The header is the first row made of <th> cells
    let header_row = rows
        .by_ref()
        .find(|row| row.select(&th_sel).next().is_some())
        .ok_or_else(|| parse_error("Reservation table has no header row"))?;
    let columns = resolve_columns(&expand_cells(header_row.select(&th_sel)))?;

    let mut reservations = Vec::new();
    for (index, row) in rows.enumerate() {
        let tds: Vec<ElementRef<'_>> = row.select(&td_sel).collect();
        if tds.is_empty() {
            continue;
        }

        // A lone spanning cell is the portal's "no reservations" placeholder
        if tds.len() == 1 && colspan(&tds[0]) > 1 {
            continue;
        }

        let cells = expand_cells(tds.into_iter());
        if cells.len() < columns.width() {
            return Err(parse_error(&format!(
                "Reservation row {} has {} cells, expected at least {}",
                index + 1,
                cells.len(),
                columns.width()
            )));
        }

        reservations.push(ReservationRow {
            date: cells[columns.date].clone(),
            time_range: cells[columns.time_range].clone(),
            activity: cells[columns.activity].clone(),
        });
    }

    Ok(reservations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <table id="table-reservation-list" class="table">
          <thead>
            <tr>
              <th colspan="2">Your Reservations</th>
              <th>Activity</th>
              <th>&nbsp;</th>
            </tr>
          </thead>
          <tbody>
            <tr>
              <td>Sat, Oct 05, 2024</td>
              <td>8:00 AM - 9:30 AM</td>
              <td>Tennis   Court
                  4</td>
              <td><a href="/cancel/1">Cancel</a></td>
            </tr>
            <tr>
              <td>Sun, Oct 06, 2024</td>
              <td>10:00 AM - 11:00 AM</td>
              <td>Pickleball</td>
              <td><a href="/cancel/2">Cancel</a></td>
            </tr>
          </tbody>
        </table>
    "#;

    #[test]
    fn test_parse_rows_in_order() {
        let rows = parse_reservation_table(TABLE).unwrap();
        assert_eq!(
            rows,
            vec![
                ReservationRow::new("Sat, Oct 05, 2024", "8:00 AM - 9:30 AM", "Tennis Court 4"),
                ReservationRow::new("Sun, Oct 06, 2024", "10:00 AM - 11:00 AM", "Pickleball"),
            ]
        );
    }

    #[test]
    fn test_empty_table_yields_no_rows() {
        let html = r#"
            <table id="table-reservation-list">
              <thead><tr><th colspan="2">Your Reservations</th><th>Activity</th></tr></thead>
              <tbody></tbody>
            </table>
        "#;
        assert!(parse_reservation_table(html).unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_row_is_skipped() {
        let html = r#"
            <table>
              <tr><th colspan="2">Your Reservations</th><th>Activity</th></tr>
              <tr><td colspan="3">You have no upcoming reservations</td></tr>
            </table>
        "#;
        assert!(parse_reservation_table(html).unwrap().is_empty());
    }

    #[test]
    fn test_separate_header_cells() {
        let html = r#"
            <table>
              <tr><th>Your Reservations</th><th>Your Reservations</th><th>Activity</th></tr>
              <tr><td>Sat, Oct 05, 2024</td><td>8:00 AM - 9:30 AM</td><td>Tennis</td></tr>
            </table>
        "#;
        let rows = parse_reservation_table(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].activity, "Tennis");
    }

    #[test]
    fn test_missing_table() {
        assert!(parse_reservation_table("<div>Nothing here</div>").is_err());
    }

    #[test]
    fn test_missing_activity_column() {
        let html = r#"
            <table>
              <tr><th colspan="2">Your Reservations</th><th>Court</th></tr>
              <tr><td>Sat, Oct 05, 2024</td><td>8:00 AM - 9:30 AM</td><td>4</td></tr>
            </table>
        "#;
        let err = parse_reservation_table(html).unwrap_err();
        assert!(err.to_string().contains("Activity"));
    }

    #[test]
    fn test_oversized_colspan_is_capped() {
        let html = r#"
            <table>
              <tr><th colspan="4294967295">Your Reservations</th><th>Activity</th></tr>
              <tr><td>Sat, Oct 05, 2024</td><td colspan="30000000">x</td></tr>
            </table>
        "#;
        let document = Html::parse_fragment(html);
        let td_sel = selector("td").unwrap();
        let cells = expand_cells(document.select(&td_sel));
        assert_eq!(cells.len(), 1 + MAX_COLSPAN);

        let rows = parse_reservation_table(html).unwrap();
        assert_eq!(rows, vec![ReservationRow::new("Sat, Oct 05, 2024", "x", "x")]);
    }

    #[test]
    fn test_short_row_fails_whole_table() {
        let html = r#"
            <table>
              <tr><th colspan="2">Your Reservations</th><th>Activity</th></tr>
              <tr><td>Sat, Oct 05, 2024</td><td>8:00 AM - 9:30 AM</td><td>Tennis</td></tr>
              <tr><td>Sun, Oct 06, 2024</td><td>10:00 AM - 11:00 AM</td></tr>
            </table>
        "#;
        assert!(parse_reservation_table(html).is_err());
    }
}
