//! Human-readable and JSON rendering of command results and errors.
//!
//! Calculations stay unrounded until they reach this module. Amounts are
//! shown in dollars and rates as percentages, both rounded half-up to two
//! decimal places.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tax_core::calculations::common::{percentage, round_half_up};
use tax_core::{
    BracketAllocation, BracketTable, ErrorKind, SupportedTaxYears, TaxApiError, TaxBracket,
    TaxCalculationResult,
};

// =============================================================================
// Number formatting
// =============================================================================

/// `1234567.891` → `"$1,234,567.89"`.
pub fn format_money(amount: Decimal) -> String {
    let rounded = round_half_up(amount);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

/// `0.205` → `"20.50%"`.
pub fn format_rate(rate: Decimal) -> String {
    format!("{:.2}%", percentage(rate))
}

fn format_range(bracket: &TaxBracket) -> String {
    match bracket.max {
        Some(max) => format!("{} - {}", format_money(bracket.min), format_money(max)),
        None => format!("{} and up", format_money(bracket.min)),
    }
}

// =============================================================================
// Human-readable views
// =============================================================================

pub struct CalculationView<'a> {
    pub tax_year: i32,
    pub annual_income: Decimal,
    pub result: &'a TaxCalculationResult,
}

impl fmt::Display for CalculationView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Tax year:        {}", self.tax_year)?;
        writeln!(f, "Annual income:   {}", format_money(self.annual_income))?;
        writeln!(f, "Total tax:       {}", format_money(self.result.total_tax))?;
        writeln!(f, "Effective rate:  {}", format_rate(self.result.effective_rate))?;
        writeln!(f, "Marginal rate:   {}", format_rate(self.result.marginal_rate()))?;

        if self.result.per_bracket.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "{:<30} {:>8} {:>16} {:>14}", "Bracket", "Rate", "Taxable", "Tax")?;
        for BracketAllocation {
            bracket,
            taxable_amount,
            tax_amount,
        } in &self.result.per_bracket
        {
            writeln!(
                f,
                "{:<30} {:>8} {:>16} {:>14}",
                format_range(bracket),
                format_rate(bracket.rate),
                format_money(*taxable_amount),
                format_money(*tax_amount)
            )?;
        }
        Ok(())
    }
}

pub struct BracketsView<'a> {
    pub tax_year: i32,
    pub table: &'a BracketTable,
}

impl fmt::Display for BracketsView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Tax brackets for {}", self.tax_year)?;
        writeln!(f)?;
        writeln!(f, "{:<30} {:>8}", "Bracket", "Rate")?;
        for bracket in self.table {
            writeln!(f, "{:<30} {:>8}", format_range(bracket), format_rate(bracket.rate))?;
        }
        Ok(())
    }
}

pub struct YearsView<'a>(pub &'a SupportedTaxYears);

impl fmt::Display for YearsView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Supported tax years: {}", self.0)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Process exit status for a failed command: 2 when the caller's input was
/// rejected, 1 for everything else.
pub fn exit_status(kind: ErrorKind) -> u8 {
    if kind.is_validation() { 2 } else { 1 }
}

pub fn error_title(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidTaxYear | ErrorKind::InvalidIncome => "Invalid Input",
        ErrorKind::NetworkError => "Connection Error",
        ErrorKind::InvalidResponse | ErrorKind::ServerError => "API Error",
        ErrorKind::Cancelled => "Cancelled",
    }
}

pub fn error_hint(
    kind: ErrorKind,
    base_url: &str,
) -> String {
    match kind {
        ErrorKind::InvalidTaxYear => {
            "Choose a supported tax year (run `tax-calculator years` to list them).".to_string()
        }
        ErrorKind::InvalidIncome => "Enter an income of zero or more.".to_string(),
        ErrorKind::NetworkError => {
            format!("Unable to reach the tax API. Ensure the API server is running at {base_url}.")
        }
        ErrorKind::InvalidResponse | ErrorKind::ServerError => {
            "The tax API returned an unusable response. Please try again.".to_string()
        }
        ErrorKind::Cancelled => "The request was stopped before it completed.".to_string(),
    }
}

/// Title, message, status and remediation hint for a failed command.
pub struct ErrorView<'a> {
    pub error: &'a TaxApiError,
    pub base_url: &'a str,
}

impl fmt::Display for ErrorView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let kind = self.error.kind();
        writeln!(f, "{}: {}", error_title(kind), self.error)?;
        if let Some(status) = self.error.status() {
            writeln!(f, "Status code: {status}")?;
        }
        if let Some(code) = self.error.remote_code() {
            writeln!(f, "Server code: {code}")?;
        }
        writeln!(f, "Hint: {}", error_hint(kind, self.base_url))
    }
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CalculationReport<'a> {
    pub tax_year: i32,
    pub annual_income: Decimal,
    pub marginal_rate: Decimal,
    #[serde(flatten)]
    pub result: &'a TaxCalculationResult,
}

#[derive(Debug, Serialize)]
pub struct BracketsReport<'a> {
    pub tax_year: i32,
    pub tax_brackets: &'a BracketTable,
}

#[derive(Debug, Serialize)]
pub struct YearsReport<'a> {
    pub supported_years: &'a SupportedTaxYears,
}

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
