//! Order records and their segmented form.
//!
//! This module contains [`OrderRecord`], one cleaned row of the orders
//! query, and [`SegmentedReport`], the invoiced/pending partition built by
//! the transformer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One row exactly as the BI API returned it, keyed by qualified column name
/// (e.g. `fPedidos[Pedido - Texto]`).
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// A single order after column normalization and type coercion.
///
/// Typed fields are `None` when the source cell was empty or could not be
/// coerced; such rows are kept and counted in [`DataQuality`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    /// Org unit (company) identifier.
    pub org_unit: Option<i64>,
    /// Order date.
    pub date: Option<NaiveDate>,
    /// Trimmed status label.
    pub status: String,
    /// Order value.
    pub value: Option<Decimal>,
    /// Free-form business columns keyed by internal name.
    pub attributes: BTreeMap<String, String>,
}

impl OrderRecord {
    /// Creates a record with no free-form attributes.
    pub fn new(
        org_unit: i64,
        date: NaiveDate,
        status: impl Into<String>,
        value: Decimal,
    ) -> Self {
        Self {
            org_unit: Some(org_unit),
            date: Some(date),
            status: status.into(),
            value: Some(value),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a free-form attribute, returning the record.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the value used in sums; missing values count as zero.
    pub fn value_or_zero(&self) -> Decimal {
        self.value.unwrap_or(Decimal::ZERO)
    }
}

/// The two report segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Status equals the invoiced marker.
    Invoiced,
    /// Any other status.
    Pending,
}

/// Count and value sum of one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentTotals {
    /// Number of records.
    pub count: usize,
    /// Sum of record values.
    pub sum_value: Decimal,
}

impl SegmentTotals {
    /// Computes totals over a slice of records.
    pub fn of(records: &[OrderRecord]) -> Self {
        Self {
            count: records.len(),
            sum_value: records.iter().map(OrderRecord::value_or_zero).sum(),
        }
    }
}

/// Data-quality observations made while reshaping rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    /// Rows whose date was missing or unparseable.
    pub unparsed_dates: usize,
    /// Rows whose value was missing or unparseable.
    pub unparsed_values: usize,
    /// Rows whose org unit was missing or unparseable.
    pub unparsed_org_units: usize,
    /// Status labels outside the configured known set.
    pub unknown_statuses: BTreeSet<String>,
}

impl DataQuality {
    /// Returns true when nothing worth a warning was seen.
    pub fn is_clean(&self) -> bool {
        self.unparsed_dates == 0
            && self.unparsed_values == 0
            && self.unparsed_org_units == 0
            && self.unknown_statuses.is_empty()
    }
}

/// Orders of one team split into invoiced and pending.
///
/// Every input record lands in exactly one of the two sequences, in input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentedReport {
    /// Orders whose status is the invoiced marker.
    pub invoiced: Vec<OrderRecord>,
    /// Every other order.
    pub pending: Vec<OrderRecord>,
    /// Totals of `invoiced`.
    pub invoiced_totals: SegmentTotals,
    /// Totals of `pending`.
    pub pending_totals: SegmentTotals,
    /// Extra columns seen in the source that the column table does not map,
    /// in first-seen order.
    pub extra_columns: Vec<String>,
    /// Data-quality observations.
    pub quality: DataQuality,
}

impl SegmentedReport {
    /// Builds a report from already-partitioned records, computing totals.
    pub fn new(invoiced: Vec<OrderRecord>, pending: Vec<OrderRecord>) -> Self {
        let invoiced_totals = SegmentTotals::of(&invoiced);
        let pending_totals = SegmentTotals::of(&pending);
        Self {
            invoiced,
            pending,
            invoiced_totals,
            pending_totals,
            extra_columns: Vec::new(),
            quality: DataQuality::default(),
        }
    }

    /// Returns the records of one segment.
    pub fn records(&self, segment: Segment) -> &[OrderRecord] {
        match segment {
            Segment::Invoiced => &self.invoiced,
            Segment::Pending => &self.pending,
        }
    }

    /// Returns the totals of one segment.
    pub fn totals(&self, segment: Segment) -> SegmentTotals {
        match segment {
            Segment::Invoiced => self.invoiced_totals,
            Segment::Pending => self.pending_totals,
        }
    }

    /// Number of records across both segments.
    pub fn total_count(&self) -> usize {
        self.invoiced_totals.count + self.pending_totals.count
    }

    /// Value sum across both segments.
    pub fn total_value(&self) -> Decimal {
        self.invoiced_totals.sum_value + self.pending_totals.sum_value
    }

    /// Returns true when neither segment has records.
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order(status: &str, value: &str) -> OrderRecord {
        OrderRecord::new(
            11,
            NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            status,
            dec(value),
        )
    }

    #[test]
    fn test_new_computes_segment_totals() {
        let report = SegmentedReport::new(
            vec![order("Faturado", "100.50"), order("Faturado", "49.50")],
            vec![order("Pendente", "10")],
        );

        assert_eq!(report.invoiced_totals.count, 2);
        assert_eq!(report.invoiced_totals.sum_value, dec("150.00"));
        assert_eq!(report.pending_totals.count, 1);
        assert_eq!(report.pending_totals.sum_value, dec("10"));
        assert_eq!(report.total_count(), 3);
        assert_eq!(report.total_value(), dec("160.00"));
    }

    #[test]
    fn test_missing_value_counts_as_zero() {
        let mut record = order("Faturado", "1");
        record.value = None;
        assert_eq!(SegmentTotals::of(&[record]).sum_value, Decimal::ZERO);
    }

    #[test]
    fn test_empty_report_has_zero_totals() {
        let report = SegmentedReport::default();
        assert!(report.is_empty());
        assert_eq!(report.totals(Segment::Invoiced), SegmentTotals::default());
        assert_eq!(report.total_value(), Decimal::ZERO);
    }

    #[test]
    fn test_records_by_segment() {
        let report = SegmentedReport::new(vec![order("Faturado", "1")], vec![]);
        assert_eq!(report.records(Segment::Invoiced).len(), 1);
        assert!(report.records(Segment::Pending).is_empty());
    }

    #[test]
    fn test_with_attribute_sets_free_form_column() {
        let record = order("Faturado", "1").with_attribute("seller", "Bruno");
        assert_eq!(record.attributes.get("seller").map(String::as_str), Some("Bruno"));
    }
}
