use super::super::domain::{
    OrderField, OrderRecord, PaymentMethod, MAX_CANCELLATION_HISTORY, MAX_ORDER_HOUR,
};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct OrderRow {
    pub(crate) line: u64,
    pub(crate) order_id: String,
    pub(crate) order: OrderRecord,
    pub(crate) cancelled: Option<bool>,
}

/// Column that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellError {
    pub(crate) line: u64,
    pub(crate) column: &'static str,
    pub(crate) value: String,
}

#[derive(Debug)]
pub(crate) enum ParseError {
    Csv(csv::Error),
    Cell(CellError),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<OrderRow>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<OrderCsvRow>().enumerate() {
        let row = record?;
        // header occupies line 1
        let line = index as u64 + 2;
        rows.push(row.into_order_row(line).map_err(ParseError::Cell)?);
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct OrderCsvRow {
    #[serde(rename = "Order ID", default)]
    order_id: Option<String>,
    #[serde(rename = "Delivery Time")]
    delivery_time: f64,
    #[serde(rename = "Order Value")]
    order_value: f64,
    #[serde(rename = "Cancellation History")]
    cancellation_history: f64,
    #[serde(rename = "Distance")]
    distance: f64,
    #[serde(rename = "Time of Order")]
    time_of_order: String,
    #[serde(rename = "Payment Method")]
    payment_method: String,
    #[serde(rename = "Address Issues")]
    address_issues: String,
    #[serde(rename = "Peak Hour Order")]
    peak_hour_order: String,
    #[serde(
        rename = "Customer Email",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    customer_email: Option<String>,
    #[serde(rename = "Canceled", default, deserialize_with = "empty_string_as_none")]
    canceled: Option<String>,
}

impl OrderCsvRow {
    fn into_order_row(self, line: u64) -> Result<OrderRow, CellError> {
        let cell = |column: &'static str, value: String| CellError {
            line,
            column,
            value,
        };

        let delivery_time_minutes = whole_number(self.delivery_time, u32::MAX.into())
            .ok_or_else(|| cell("Delivery Time", self.delivery_time.to_string()))?
            as u32;
        let cancellation_history_count =
            whole_number(self.cancellation_history, MAX_CANCELLATION_HISTORY.into())
                .ok_or_else(|| {
                    cell("Cancellation History", self.cancellation_history.to_string())
                })? as u8;
        let order_hour = parse_hour(&self.time_of_order)
            .ok_or_else(|| cell("Time of Order", self.time_of_order.clone()))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| cell("Payment Method", self.payment_method.clone()))?;
        let has_address_issue = parse_flag(&self.address_issues)
            .ok_or_else(|| cell("Address Issues", self.address_issues.clone()))?;
        let is_peak_hour_order = parse_flag(&self.peak_hour_order)
            .ok_or_else(|| cell("Peak Hour Order", self.peak_hour_order.clone()))?;
        let cancelled = match self.canceled {
            Some(raw) => Some(parse_flag(&raw).ok_or_else(|| cell("Canceled", raw.clone()))?),
            None => None,
        };

        let order = OrderRecord {
            delivery_time_minutes,
            order_value: self.order_value,
            cancellation_history_count,
            distance_km: self.distance,
            order_hour,
            payment_method,
            has_address_issue,
            is_peak_hour_order,
            customer_email: self.customer_email.unwrap_or_default(),
        };

        Ok(OrderRow {
            line,
            order_id: self
                .order_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("row-{line}")),
            order,
            cancelled,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn whole_number(value: f64, max: u64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= max as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Accepts a bare hour (`18`) or a clock time (`18:30`).
fn parse_hour(raw: &str) -> Option<u8> {
    let hour = raw.trim().split(':').next()?.trim();
    let hour = hour.parse::<u8>().ok()?;
    (hour <= MAX_ORDER_HOUR).then_some(hour)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "y" | "true" => Some(true),
        "0" | "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn field_column(field: OrderField) -> &'static str {
    match field {
        OrderField::DeliveryTimeMinutes => "Delivery Time",
        OrderField::OrderValue => "Order Value",
        OrderField::CancellationHistoryCount => "Cancellation History",
        OrderField::DistanceKm => "Distance",
        OrderField::OrderHour => "Time of Order",
        OrderField::PaymentMethod => "Payment Method",
        OrderField::HasAddressIssue => "Address Issues",
        OrderField::IsPeakHourOrder => "Peak Hour Order",
        OrderField::CustomerEmail => "Customer Email",
    }
}

#[cfg(test)]
pub(crate) fn parse_hour_for_tests(raw: &str) -> Option<u8> {
    parse_hour(raw)
}
