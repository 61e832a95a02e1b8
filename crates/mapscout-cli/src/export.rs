//! CSV and JSON serialisation of the final record set.

use std::io::Write;

use clap::ValueEnum;
use mapscout_core::BusinessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

pub(crate) const CSV_HEADER: [&str; 9] = [
    "Query",
    "Business Name",
    "Category",
    "Rating",
    "Review Count",
    "Address",
    "Phone",
    "Website",
    "Email",
];

/// Writes `records` to `out` in the requested format.
///
/// # Errors
///
/// Returns an error if serialisation or the underlying write fails.
pub(crate) fn write_records<W: Write>(
    records: &[BusinessRecord],
    format: ExportFormat,
    out: W,
) -> anyhow::Result<()> {
    match format {
        ExportFormat::Csv => write_csv(records, out),
        ExportFormat::Json => write_json(records, out),
    }
}

fn write_csv<W: Write>(records: &[BusinessRecord], out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(csv_row(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_row(record: &BusinessRecord) -> [String; 9] {
    let cell = |value: Option<&str>| value.unwrap_or_default().to_owned();
    [
        record.source_query.clone(),
        record.name.clone(),
        cell(record.category.as_deref()),
        record.rating.map(|r| r.to_string()).unwrap_or_default(),
        record.review_count.map(|c| c.to_string()).unwrap_or_default(),
        cell(record.address.as_deref()),
        cell(record.phone.as_deref()),
        cell(record.website.as_deref()),
        cell(record.email.as_deref()),
    ]
}

fn write_json<W: Write>(records: &[BusinessRecord], mut out: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lune() -> BusinessRecord {
        BusinessRecord {
            name: "Café Lune".to_owned(),
            category: Some("Café".to_owned()),
            address: Some("12 Rue de Rivoli, Paris".to_owned()),
            phone: Some("+33142000000".to_owned()),
            website: Some("https://cafelune.example/".to_owned()),
            rating: Some("4.5".parse().unwrap()),
            review_count: Some(1024),
            email: Some("bonjour@cafelune.example".to_owned()),
            source_query: "cafes in paris".to_owned(),
        }
    }

    fn sparse() -> BusinessRecord {
        BusinessRecord {
            name: "Le Petit Four".to_owned(),
            category: None,
            address: None,
            phone: None,
            website: None,
            rating: None,
            review_count: None,
            email: None,
            source_query: "cafes in paris".to_owned(),
        }
    }

    fn render(records: &[BusinessRecord], format: ExportFormat) -> String {
        let mut buf = Vec::new();
        write_records(records, format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_header_order_is_fixed() {
        let out = render(&[], ExportFormat::Csv);
        assert_eq!(
            out.lines().next(),
            Some("Query,Business Name,Category,Rating,Review Count,Address,Phone,Website,Email")
        );
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let out = render(&[lune()], ExportFormat::Csv);
        let row = out.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "cafes in paris,Café Lune,Café,4.5,1024,\"12 Rue de Rivoli, Paris\",+33142000000,https://cafelune.example/,bonjour@cafelune.example"
        );
    }

    #[test]
    fn csv_absent_fields_are_empty_cells() {
        let out = render(&[sparse()], ExportFormat::Csv);
        assert_eq!(out.lines().nth(1), Some("cafes in paris,Le Petit Four,,,,,,,"));
    }

    #[test]
    fn json_keeps_absent_fields_as_null() {
        let out = render(&[lune(), sparse()], ExportFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Café Lune");
        assert_eq!(rows[0]["review_count"], 1024);
        assert!(rows[1]["email"].is_null());
    }
}
