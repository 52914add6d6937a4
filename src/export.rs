// src/export.rs
//
// CSV export of the canonical store (spec §6): one row per canonical
// entity, three columns, no quoting, UTF-8 without a byte-order mark.

use std::io::Write;

use crate::store::CanonicalEntity;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `entities` to `writer` as `canonicalName,variations,occurrenceCounts`,
/// `variations` and `occurrenceCounts` each semicolon-joined and
/// index-aligned with one another.
pub fn write_csv<W: Write>(writer: W, entities: &[CanonicalEntity]) -> Result<(), ExportError> {
    let mut w = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(true)
        .from_writer(writer);

    w.write_record(["canonicalName", "variations", "occurrenceCounts"])?;

    for entity in entities {
        let variations = entity
            .variations
            .iter()
            .map(|v| v.variation_text.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let counts = entity
            .variations
            .iter()
            .map(|v| v.occurrence_count.to_string())
            .collect::<Vec<_>>()
            .join(";");

        w.write_record([entity.canonical_name.as_str(), variations.as_str(), counts.as_str()])?;
    }

    w.flush()?;
    Ok(())
}

/// Render `entities` as a CSV string (for callers that want it in memory
/// rather than streamed to a file or socket).
pub fn to_csv_string(entities: &[CanonicalEntity]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, entities)?;
    Ok(String::from_utf8(buf).expect("csv writer only emits valid UTF-8 for our inputs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::store::NameVariation;
    use chrono::Utc;

    fn entity(name: &str, variations: &[(&str, u64)]) -> CanonicalEntity {
        let now = Utc::now();
        CanonicalEntity {
            id: 1,
            canonical_name: name.to_string(),
            entity_type: Category::Pessoa,
            classification_confidence: 0.8,
            grouping_confidence: 0.8,
            variations: variations
                .iter()
                .map(|(text, count)| NameVariation {
                    variation_text: text.to_string(),
                    occurrence_count: *count,
                    association_confidence: 1.0,
                    first_seen: now,
                    last_seen: now,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn header_and_row_shape() {
        let csv = to_csv_string(&[entity("Forzza, R.C.", &[("Forzza, R.C.", 3), ("Forzza, R.", 1)])]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "canonicalName,variations,occurrenceCounts");
        assert_eq!(lines.next().unwrap(), "Forzza, R.C.,Forzza, R.C.;Forzza, R.,3;1");
    }

    #[test]
    fn no_quoting_is_applied_even_with_commas_in_variations() {
        let csv = to_csv_string(&[entity("Forzza, R.C.", &[("Forzza, R.C.", 1)])]).unwrap();
        assert!(!csv.contains('"'));
    }

    #[test]
    fn output_has_no_byte_order_mark() {
        let csv = to_csv_string(&[entity("Soares, A.", &[("Soares, A.", 1)])]).unwrap();
        assert!(!csv.starts_with('\u{feff}'));
    }

    #[test]
    fn empty_store_still_emits_header() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.trim_end(), "canonicalName,variations,occurrenceCounts");
    }
}
