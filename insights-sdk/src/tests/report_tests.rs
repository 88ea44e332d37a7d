//! Tests for the tabular record view

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::assembler::assemble;
    use crate::report::{render_table, rows, COLUMNS};
    use crate::tests::support::*;

    #[test]
    fn test_rows_follow_column_order() {
        let records = vec![
            assemble(&entry("ok-1", 200), json!({"a": 1}), json!(null)).unwrap(),
            assemble(&entry("bad-1", 400), json!({}), invalid_instruments_response()).unwrap(),
        ];

        let rows = rows(&records);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == COLUMNS.len()));

        assert_eq!(rows[0][0], "ok-1");
        assert_eq!(rows[0][2], "Success");
        assert_eq!(rows[0][3], "200");
        assert_eq!(rows[0][4], "");
        assert_eq!(rows[0][6], r#"{"a":1}"#);
        assert_eq!(rows[0][7], "");

        assert_eq!(rows[1][2], "Failure");
        assert_eq!(rows[1][4], "InvalidParameterValue");
        assert_eq!(rows[1][5], "instruments: must not be empty");
    }

    #[test]
    fn test_long_json_is_truncated() {
        let record = assemble(&entry("ok-1", 200), valuation_request(json!([])), valuation_response()).unwrap();
        let request_cell = &rows(&[record])[0][6];

        assert_eq!(request_cell.chars().count(), 60);
        assert!(request_cell.ends_with("..."));
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let records = vec![
            assemble(&entry("ok-1", 200), json!({}), json!({})).unwrap(),
            assemble(&entry("bad-1", 400), json!({}), invalid_instruments_response()).unwrap(),
        ];

        let table = render_table(&records);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("id    | timestamp"));
        assert!(lines[1].starts_with("------+-"));
        assert!(lines[2].starts_with("ok-1  | "));
        assert!(lines[3].starts_with("bad-1 | "));

        // Separators line up across rows
        let first_bar = |line: &str| line.find(" | ");
        assert_eq!(first_bar(lines[0]), first_bar(lines[2]));
        assert_eq!(first_bar(lines[0]), first_bar(lines[3]));
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = render_table(&[]);
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains("error_details"));
    }
}
