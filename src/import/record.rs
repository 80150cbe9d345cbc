use std::collections::BTreeMap;

use crate::error::{ImportError, ImportResult};

use super::EntityKind;

pub const DELIMITER: u8 = b'^';
pub const QUOTE: u8 = b'~';
/// The single-character flag value meaning "yes".
pub const YES_MARKER: &str = "Y";

/// Position of a row inside its member, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAt {
    pub entity: EntityKind,
    pub line: usize,
}

impl RowAt {
    pub fn dangling(self, target: EntityKind, key: impl ToString) -> ImportError {
        ImportError::DanglingReference {
            entity: self.entity,
            line: self.line,
            target,
            key: key.to_string(),
        }
    }

    /// Adapter for `map_err` on store calls made for this row.
    pub fn write_error(self) -> impl FnOnce(sqlx::Error) -> ImportError {
        move |err| ImportError::from_row_write(self.entity, self.line, err)
    }
}

/// Split one line into named fields.
///
/// Missing trailing fields are simply absent from the map; extra fields are
/// dropped. An unterminated quote runs to the end of the line.
pub fn parse_line(line: &str, fields: &'static [&'static str]) -> BTreeMap<&'static str, String> {
    LineParser::new().fields(line, fields)
}

/// Parse one member line into a [`RawRecord`] for `entity`.
pub fn parse_record(
    entity: EntityKind,
    line: usize,
    text: &str,
    fields: &'static [&'static str],
) -> RawRecord {
    LineParser::new().record(entity, line, text, fields)
}

/// Reusable `^`/`~` line splitter, held for the length of a pass.
pub struct LineParser {
    builder: csv::ReaderBuilder,
    scratch: csv::StringRecord,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    // SR22 lines stay well under this; longer ones are read in chunks.
    const LINE_BUFFER: usize = 512;

    pub fn new() -> Self {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(DELIMITER)
            .quote(QUOTE)
            .has_headers(false)
            .flexible(true)
            .buffer_capacity(Self::LINE_BUFFER);
        Self {
            builder,
            scratch: csv::StringRecord::new(),
        }
    }

    pub fn fields(
        &mut self,
        line: &str,
        fields: &'static [&'static str],
    ) -> BTreeMap<&'static str, String> {
        let mut reader = self.builder.from_reader(line.as_bytes());
        // In-memory UTF-8 input with flexible rows cannot fail to read.
        if !matches!(reader.read_record(&mut self.scratch), Ok(true)) {
            self.scratch.clear();
        }
        fields
            .iter()
            .copied()
            .zip(self.scratch.iter().map(str::to_string))
            .collect()
    }

    pub fn record(
        &mut self,
        entity: EntityKind,
        line: usize,
        text: &str,
        fields: &'static [&'static str],
    ) -> RawRecord {
        RawRecord {
            at: RowAt { entity, line },
            values: self.fields(text, fields),
        }
    }
}

/// A parsed line with typed accessors. Required accessors fail with
/// [`ImportError::FieldParse`]; optional ones treat blank as absent.
#[derive(Debug, Clone)]
pub struct RawRecord {
    at: RowAt,
    values: BTreeMap<&'static str, String>,
}

impl RawRecord {
    pub fn at(&self) -> RowAt {
        self.at
    }

    /// Raw value, `None` when the field was not present on the line.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    fn non_blank(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|value| !value.trim().is_empty())
    }

    fn parse_error(&self, field: &'static str) -> ImportError {
        ImportError::FieldParse {
            entity: self.at.entity,
            line: self.at.line,
            field,
            value: self.get(field).unwrap_or_default().to_string(),
        }
    }

    pub fn required_int(&self, field: &'static str) -> ImportResult<i64> {
        self.optional_int(field)?
            .ok_or_else(|| self.parse_error(field))
    }

    pub fn optional_int(&self, field: &'static str) -> ImportResult<Option<i64>> {
        match self.non_blank(field) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.parse_error(field)),
        }
    }

    pub fn required_float(&self, field: &'static str) -> ImportResult<f64> {
        self.optional_float(field)?
            .ok_or_else(|| self.parse_error(field))
    }

    pub fn optional_float(&self, field: &'static str) -> ImportResult<Option<f64>> {
        match self.non_blank(field) {
            None => Ok(None),
            Some(value) => match value.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
                _ => Err(self.parse_error(field)),
            },
        }
    }

    /// Key text, trimmed before it is cut to `max_len`.
    pub fn optional_key(&self, field: &str, max_len: usize) -> Option<String> {
        self.non_blank(field)
            .map(|value| truncate(value.trim(), max_len))
    }

    /// Required key text; blank is a parse failure.
    pub fn required_key(&self, field: &'static str, max_len: usize) -> ImportResult<String> {
        self.optional_key(field, max_len)
            .ok_or_else(|| self.parse_error(field))
    }

    /// Text for a NOT NULL column; absent becomes empty, long values are cut.
    pub fn text(&self, field: &str, max_len: usize) -> String {
        truncate(self.get(field).unwrap_or_default(), max_len)
    }

    pub fn optional_text(&self, field: &str, max_len: usize) -> Option<String> {
        self.non_blank(field).map(|value| truncate(value, max_len))
    }

    /// `Some(true)` only for the exact yes marker, `None` when blank.
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.non_blank(field).map(|value| value == YES_MARKER)
    }
}

/// Keep at most `max_len` characters.
pub fn truncate(value: &str, max_len: usize) -> String {
    value.chars().take(max_len).collect()
}

/// Lines with nothing but whitespace or a trailing DOS end-of-file marker.
pub fn is_blank(line: &str) -> bool {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{1a}')
        .is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["ndb_no", "seq", "amount", "msre_desc", "gm_wgt"];

    fn record(line: &str) -> RawRecord {
        parse_record(EntityKind::Weight, 7, line, FIELDS)
    }

    #[test]
    fn splits_quoted_and_bare_fields() {
        let parsed = parse_line("~01001~^~1~^1^~pat (1\" sq, 1/3\" high)~^5.0", FIELDS);
        assert_eq!(parsed["ndb_no"], "01001");
        assert_eq!(parsed["seq"], "1");
        assert_eq!(parsed["amount"], "1");
        assert_eq!(parsed["msre_desc"], "pat (1\" sq, 1/3\" high)");
        assert_eq!(parsed["gm_wgt"], "5.0");
    }

    #[test]
    fn delimiter_inside_quotes_is_kept() {
        let parsed = parse_line("~1~^~a^b~", &["x", "y"]);
        assert_eq!(parsed["y"], "a^b");
    }

    #[test]
    fn short_rows_leave_trailing_fields_absent() {
        let rec = record("~01001~^~2~");
        assert_eq!(rec.get("seq"), Some("2"));
        assert_eq!(rec.get("amount"), None);
        assert_eq!(rec.optional_float("gm_wgt").unwrap(), None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let parsed = parse_line("1^2^3", &["a"]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["a"], "1");
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        let parsed = parse_line("~abc^x^y", &["a", "b"]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["a"], "abc^x^y");
    }

    #[test]
    fn reused_parser_does_not_leak_fields_between_lines() {
        let mut parser = LineParser::new();
        let long = format!("~{}~^~1~^1^~cup~^2.5", "9".repeat(2000));
        let first = parser.fields(&long, FIELDS);
        assert_eq!(first.len(), 5);
        assert_eq!(first["ndb_no"].len(), 2000);

        let second = parser.fields("~01001~^~2~", FIELDS);
        assert_eq!(second.len(), 2);
        assert_eq!(second, parse_line("~01001~^~2~", FIELDS));
        assert!(parser.fields("", FIELDS).is_empty());
    }

    #[test]
    fn parsing_is_pure() {
        let line = "~01001~^~1~^^~cup~^";
        assert_eq!(parse_line(line, FIELDS), parse_line(line, FIELDS));
    }

    #[test]
    fn required_int_reports_field_and_line() {
        let rec = record("~01001~^~x1~");
        match rec.required_int("seq").unwrap_err() {
            ImportError::FieldParse {
                entity,
                line,
                field,
                value,
            } => {
                assert_eq!(entity, EntityKind::Weight);
                assert_eq!(line, 7);
                assert_eq!(field, "seq");
                assert_eq!(value, "x1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_required_number_is_a_parse_error() {
        let rec = record("~01001~^~1~^^~cup~^");
        assert!(rec.required_float("amount").is_err());
        assert!(rec.required_float("gm_wgt").is_err());
    }

    #[test]
    fn leading_zeros_parse_as_integers() {
        assert_eq!(record("~01001~").required_int("ndb_no").unwrap(), 1001);
    }

    #[test]
    fn flag_is_true_only_for_yes_marker() {
        let fields: &'static [&'static str] = &["survey"];
        let flag = |line: &str| parse_record(EntityKind::Food, 1, line, fields).flag("survey");
        assert_eq!(flag("~Y~"), Some(true));
        assert_eq!(flag("~N~"), Some(false));
        assert_eq!(flag("~y~"), Some(false));
        assert_eq!(flag("~~"), None);
        assert_eq!(flag(""), None);
    }

    #[test]
    fn keys_are_trimmed_before_truncation() {
        let rec = record("~ 01001~^~  ABCDE ~");
        assert_eq!(rec.optional_key("seq", 4).as_deref(), Some("ABCD"));
        assert_eq!(rec.required_key("seq", 4).unwrap(), "ABCD");
        assert_eq!(rec.optional_key("amount", 4), None);
        assert!(rec.required_key("amount", 4).is_err());
    }

    #[test]
    fn write_error_passes_other_store_errors_through() {
        let at = RowAt {
            entity: EntityKind::Weight,
            line: 9,
        };
        let err = at.write_error()(sqlx::Error::RowNotFound);
        assert!(matches!(err, ImportError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn text_is_truncated_by_characters() {
        assert_eq!(truncate("crème brûlée", 5), "crème");
        let rec = record("~01001~^~1~^1^~abcdefghij~");
        assert_eq!(rec.text("msre_desc", 4), "abcd");
        assert_eq!(rec.text("gm_wgt", 4), "");
        assert_eq!(rec.optional_text("gm_wgt", 4), None);
    }

    #[test]
    fn blank_lines_include_eof_marker() {
        assert!(is_blank("   "));
        assert!(is_blank("\u{1a}"));
        assert!(!is_blank("~0100~"));
    }
}
