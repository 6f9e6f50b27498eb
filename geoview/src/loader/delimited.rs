//! Parser of delimited text files (CSV, TSV, DSV).

use csv::{ReaderBuilder, StringRecord};

use crate::dataset::PointTable;
use crate::error::GeoviewError;
use crate::loader::Delimiter;

/// Parses delimited text. The first row is the header; every following row becomes a record.
///
/// Rows with fewer or more fields than the header are accepted. Missing fields are reported as
/// absent by [`Record::get`](crate::Record::get), extra fields are kept but have no column name.
pub fn parse(data: &[u8], delimiter: Delimiter) -> Result<PointTable, GeoviewError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let columns = reader
        .headers()?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();

    let rows = reader
        .records()
        .map(|record| record.map(into_values))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PointTable::new(columns, rows))
}

fn into_values(record: StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_csv() {
        let data = b"Name,Longitude,Latitude\nSplit,16.44,43.51\n\"Rijeka, HR\",14.44,45.33\n";
        let table = parse(data, Delimiter::Comma).unwrap();

        assert_eq!(table.columns(), ["Name", "Longitude", "Latitude"]);
        assert_eq!(table.len(), 2);

        let second = table.get(1).unwrap();
        assert_eq!(second.get("Name"), Some("Rijeka, HR"));
        assert_eq!(second.raw_position(), (Some("14.44"), Some("45.33")));
    }

    #[test]
    fn parses_tsv_and_dsv() {
        let tsv = b"Longitude\tLatitude\tNote\n10.5\t20.25\ta,b\n";
        let table = parse(tsv, Delimiter::Tab).unwrap();
        let record = table.get(0).unwrap();
        assert_eq!(record.raw_position(), (Some("10.5"), Some("20.25")));
        assert_eq!(record.get("Note"), Some("a,b"));

        let dsv = b"Longitude|Latitude\n1|2\n3|4\n";
        let table = parse(dsv, Delimiter::Pipe).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().raw_position(), (Some("3"), Some("4")));
    }

    #[test]
    fn wrong_delimiter_yields_single_column() {
        let data = b"Longitude|Latitude\n1|2\n";
        let table = parse(data, Delimiter::Comma).unwrap();
        assert_eq!(table.columns(), ["Longitude|Latitude"]);
        assert_eq!(table.get(0).unwrap().raw_position(), (None, None));
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let data = b"Name,Longitude,Latitude\nA,1\nB,2,3,extra\n";
        let table = parse(data, Delimiter::Comma).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().raw_position(), (Some("1"), None));
        assert_eq!(table.get(1).unwrap().raw_position(), (Some("2"), Some("3")));
    }

    #[test]
    fn header_only_file_is_empty() {
        let table = parse(b"Longitude,Latitude\n", Delimiter::Comma).unwrap();
        assert!(table.is_empty());

        let table = parse(b"", Delimiter::Comma).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let data = b"Name,Longitude\n\xff\xfe,1\n";
        assert_matches!(parse(data, Delimiter::Comma), Err(GeoviewError::Parse(_)));
    }
}
