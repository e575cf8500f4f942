//! Reshaping raw query rows into a [`SegmentedReport`].
//!
//! The transformer does no business filtering: org-unit and month filters
//! already ran inside the query. It only renames, coerces and partitions.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::{BusinessRules, ColumnSpec};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{OrderRecord, RawRow, SegmentedReport};

use super::coerce::{parse_date, parse_decimal, parse_integer, to_text};

/// Internal names the transformer cannot work without.
const REQUIRED_COLUMNS: [&str; 3] = ["org_unit", "date", "status"];

/// Strips the table qualifier and brackets from a BI column name.
///
/// # Example
///
/// ```
/// use team_reports::transform::clean_column_name;
///
/// assert_eq!(clean_column_name("fPedidos[Pedido - Texto]"), "Pedido - Texto");
/// assert_eq!(clean_column_name("[Ingressado]"), "Ingressado");
/// assert_eq!(clean_column_name("Ingressado"), "Ingressado");
/// ```
pub fn clean_column_name(raw: &str) -> String {
    match raw.rfind('[') {
        Some(index) => raw[index + 1..].replace(']', "").trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Splits records by exact status match against `invoiced_marker`.
///
/// Returns `(invoiced, pending)`. Every record lands in exactly one side and
/// relative order is preserved.
pub fn partition_by_status(
    records: Vec<OrderRecord>,
    invoiced_marker: &str,
) -> (Vec<OrderRecord>, Vec<OrderRecord>) {
    records
        .into_iter()
        .partition(|record| record.status == invoiced_marker)
}

/// Turns raw order rows into a segmented report.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use team_reports::config::{BusinessRules, default_columns};
/// use team_reports::transform::Transformer;
///
/// let rules = BusinessRules::default();
/// let columns = default_columns();
/// let transformer = Transformer::new(&rules, &columns);
///
/// let row = json!({
///     "dEmpresas[Empresa]": 11,
///     "dCalendario[Data]": "2026-10-05T00:00:00",
///     "fPedidos[Legenda Situação]": "Faturado",
///     "[Ingressado]": 1000.5
/// });
/// let rows = vec![row.as_object().unwrap().clone()];
///
/// let report = transformer.transform(&rows).unwrap();
/// assert_eq!(report.invoiced.len(), 1);
/// assert!(report.pending.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Transformer<'a> {
    rules: &'a BusinessRules,
    by_source: HashMap<&'a str, &'a ColumnSpec>,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer over the given rules and column table.
    pub fn new(rules: &'a BusinessRules, columns: &'a [ColumnSpec]) -> Self {
        let by_source = columns.iter().map(|c| (c.source.as_str(), c)).collect();
        Self { rules, by_source }
    }

    /// Normalizes, coerces and partitions `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Transform`] when the rows are non-empty but
    /// none of them carries an org unit, date or status column.
    pub fn transform(&self, rows: &[RawRow]) -> PipelineResult<SegmentedReport> {
        if rows.is_empty() {
            debug!("No order rows to transform");
            return Ok(SegmentedReport::default());
        }

        self.check_required_columns(rows)?;

        let mut report = SegmentedReport::default();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.to_record(row, &mut report));
        }

        for record in &records {
            let status = record.status.as_str();
            if !self.rules.known_statuses.is_empty()
                && status != self.rules.invoiced_status
                && !self.rules.known_statuses.iter().any(|s| s == status)
            {
                report.quality.unknown_statuses.insert(status.to_string());
            }
        }

        let (invoiced, pending) = partition_by_status(records, &self.rules.invoiced_status);
        let extra_columns = std::mem::take(&mut report.extra_columns);
        let quality = std::mem::take(&mut report.quality);

        let mut report = SegmentedReport::new(invoiced, pending);
        report.extra_columns = extra_columns;
        report.quality = quality;

        if !report.quality.is_clean() {
            warn!(
                unparsed_dates = report.quality.unparsed_dates,
                unparsed_values = report.quality.unparsed_values,
                unparsed_org_units = report.quality.unparsed_org_units,
                unknown_statuses = ?report.quality.unknown_statuses,
                "Order rows have data-quality issues"
            );
        }

        info!(
            records = report.total_count(),
            invoiced = report.invoiced_totals.count,
            pending = report.pending_totals.count,
            invoiced_value = %report.invoiced_totals.sum_value,
            pending_value = %report.pending_totals.sum_value,
            "Orders segmented"
        );

        Ok(report)
    }

    fn check_required_columns(&self, rows: &[RawRow]) -> PipelineResult<()> {
        let present: Vec<&str> = rows
            .iter()
            .flat_map(|row| row.keys())
            .filter_map(|key| {
                let cleaned = clean_column_name(key);
                self.by_source.get(cleaned.as_str()).map(|c| c.name.as_str())
            })
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !present.contains(required))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Transform {
                message: format!("missing required columns: {}", missing.join(", ")),
            })
        }
    }

    fn to_record(&self, row: &RawRow, report: &mut SegmentedReport) -> OrderRecord {
        let mut record = OrderRecord {
            org_unit: None,
            date: None,
            status: String::new(),
            value: None,
            attributes: Default::default(),
        };

        for (key, cell) in row {
            let cleaned = clean_column_name(key);
            let Some(spec) = self.by_source.get(cleaned.as_str()) else {
                if !report.extra_columns.contains(&cleaned) {
                    report.extra_columns.push(cleaned.clone());
                }
                if let Some(text) = to_text(cell) {
                    record.attributes.insert(cleaned, text);
                }
                continue;
            };

            match spec.name.as_str() {
                "org_unit" => record.org_unit = parse_integer(cell),
                "date" => record.date = parse_date(cell),
                "status" => record.status = to_text(cell).unwrap_or_default(),
                "value" => record.value = parse_decimal(cell),
                other => {
                    if let Some(text) = to_text(cell) {
                        record.attributes.insert(other.to_string(), text);
                    }
                }
            }
        }

        if record.org_unit.is_none() {
            report.quality.unparsed_org_units += 1;
        }
        if record.date.is_none() {
            report.quality.unparsed_dates += 1;
        }
        if record.value.is_none() {
            report.quality.unparsed_values += 1;
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_columns;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn raw(value: Value) -> RawRow {
        value.as_object().unwrap().clone()
    }

    fn order_row(status: &str, value: f64) -> RawRow {
        raw(json!({
            "dEmpresas[Empresa]": 11,
            "dCalendario[Data]": "2026-10-05T00:00:00",
            "dEquipes[Nome da Equipe]": "Team North",
            "dVendedores[Nome Vendedor Completo]": "Bruno Lima",
            "dClientes[Nome Completo do Cliente]": "ACME",
            "fPedidos[Nota Fiscal - Texto]": "NF-001",
            "fPedidos[Pedido - Texto]": "PED-001",
            "fPedidos[Legenda Situação]": status,
            "[Ingressado]": value
        }))
    }

    fn transform(rules: &BusinessRules, rows: &[RawRow]) -> PipelineResult<SegmentedReport> {
        let columns = default_columns();
        Transformer::new(rules, &columns).transform(rows)
    }

    #[test]
    fn test_clean_column_name_variants() {
        assert_eq!(clean_column_name("dEmpresas[Empresa]"), "Empresa");
        assert_eq!(clean_column_name("fPedidos[Legenda Situação]"), "Legenda Situação");
        assert_eq!(clean_column_name("[Ingressado]"), "Ingressado");
        assert_eq!(clean_column_name(" Plain "), "Plain");
    }

    #[test]
    fn test_six_invoiced_four_pending() {
        let mut rows = Vec::new();
        for _ in 0..6 {
            rows.push(order_row("Faturado", 100.0));
        }
        for _ in 0..4 {
            rows.push(order_row("Outro", 25.5));
        }

        let report = transform(&BusinessRules::default(), &rows).unwrap();

        assert_eq!(report.invoiced.len(), 6);
        assert_eq!(report.pending.len(), 4);
        assert_eq!(report.invoiced_totals.sum_value, dec("600"));
        assert_eq!(report.pending_totals.sum_value, dec("102"));
    }

    #[test]
    fn test_record_fields_are_coerced_and_mapped() {
        let report = transform(&BusinessRules::default(), &[order_row("Faturado", 1000.5)]).unwrap();
        let record = &report.invoiced[0];

        assert_eq!(record.org_unit, Some(11));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 10, 5));
        assert_eq!(record.value, Some(dec("1000.5")));
        assert_eq!(record.attributes["seller"], "Bruno Lima");
        assert_eq!(record.attributes["order_number"], "PED-001");
        assert!(report.extra_columns.is_empty());
        assert!(report.quality.is_clean());
    }

    #[test]
    fn test_status_is_trimmed_before_matching() {
        let report = transform(&BusinessRules::default(), &[order_row("  Faturado ", 1.0)]).unwrap();
        assert_eq!(report.invoiced.len(), 1);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let report = transform(&BusinessRules::default(), &[order_row("faturado", 1.0)]).unwrap();
        assert_eq!(report.pending.len(), 1);
    }

    #[test]
    fn test_empty_rows_give_empty_report() {
        let report = transform(&BusinessRules::default(), &[]).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.invoiced_totals.sum_value, Decimal::ZERO);
    }

    #[test]
    fn test_missing_required_columns_is_an_error() {
        let rows = vec![raw(json!({ "dClientes[Nome Completo do Cliente]": "ACME" }))];
        let result = transform(&BusinessRules::default(), &rows);

        match result {
            Err(PipelineError::Transform { message }) => {
                assert!(message.contains("org_unit"));
                assert!(message.contains("date"));
                assert!(message.contains("status"));
            }
            other => panic!("Expected Transform error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_cells_are_kept_and_counted() {
        let rows = vec![raw(json!({
            "dEmpresas[Empresa]": "eleven",
            "dCalendario[Data]": "someday",
            "fPedidos[Legenda Situação]": "Faturado",
            "[Ingressado]": "lots"
        }))];
        let report = transform(&BusinessRules::default(), &rows).unwrap();

        assert_eq!(report.total_count(), 1);
        assert_eq!(report.quality.unparsed_dates, 1);
        assert_eq!(report.quality.unparsed_values, 1);
        assert_eq!(report.quality.unparsed_org_units, 1);
        assert_eq!(report.invoiced_totals.sum_value, Decimal::ZERO);
    }

    #[test]
    fn test_unmapped_columns_are_kept_as_extras() {
        let mut row = order_row("Faturado", 1.0);
        row.insert("fPedidos[Canal]".to_string(), json!("Web"));
        let report = transform(&BusinessRules::default(), &[row]).unwrap();

        assert_eq!(report.extra_columns, vec!["Canal".to_string()]);
        assert_eq!(report.invoiced[0].attributes["Canal"], "Web");
    }

    #[test]
    fn test_unknown_status_flagged_only_with_known_list() {
        let rows = vec![order_row("Cancelado?", 1.0), order_row("Pendente", 1.0)];

        let plain = transform(&BusinessRules::default(), &rows).unwrap();
        assert!(plain.quality.unknown_statuses.is_empty());

        let rules = BusinessRules {
            known_statuses: vec!["Pendente".to_string()],
            ..BusinessRules::default()
        };
        let strict = transform(&rules, &rows).unwrap();
        assert_eq!(strict.pending.len(), 2);
        assert!(strict.quality.unknown_statuses.contains("Cancelado?"));
        assert_eq!(strict.quality.unknown_statuses.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_partition_is_total_and_disjoint(
            statuses in proptest::collection::vec(
                prop_oneof![
                    Just("Faturado".to_string()),
                    Just("Pendente".to_string()),
                    "[A-Za-z ]{0,12}",
                ],
                0..60,
            )
        ) {
            let rows: Vec<RawRow> = statuses.iter().map(|s| order_row(s, 1.0)).collect();
            let report = transform(&BusinessRules::default(), &rows).unwrap();

            prop_assert_eq!(report.invoiced.len() + report.pending.len(), rows.len());
            prop_assert!(report.invoiced.iter().all(|r| r.status == "Faturado"));
            prop_assert!(report.pending.iter().all(|r| r.status != "Faturado"));
            prop_assert_eq!(report.invoiced_totals.count, report.invoiced.len());
            prop_assert_eq!(report.pending_totals.count, report.pending.len());
        }
    }
}
