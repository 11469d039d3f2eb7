//! Text formatting and parsing for parameter values

use std::fmt;

type Parser<T> = Box<dyn Fn(&str) -> Option<T>>;
type Printer<T> = Box<dyn Fn(T) -> String>;

/// Formats a value for display and parses user text back into a value
///
/// Units are stripped before parsing, so `"440 Hz"` and `"440"` parse the
/// same for a mapping with post unit `"Hz"`.
pub struct PrintMapping<T> {
    parser: Parser<T>,
    printer: Printer<T>,
    pre_unit: &'static str,
    post_unit: &'static str,
}

impl<T: Copy + 'static> PrintMapping<T> {
    pub fn new(
        parser: impl Fn(&str) -> Option<T> + 'static,
        printer: impl Fn(T) -> String + 'static,
        pre_unit: &'static str,
        post_unit: &'static str,
    ) -> Self {
        Self {
            parser: Box::new(parser),
            printer: Box::new(printer),
            pre_unit,
            post_unit,
        }
    }

    /// Parse text, tolerating the mapping's units around the number
    pub fn parse(&self, text: &str) -> Option<T> {
        let mut text = text.trim();
        if !self.pre_unit.is_empty() {
            text = text.strip_prefix(self.pre_unit).unwrap_or(text).trim_start();
        }
        if !self.post_unit.is_empty() {
            text = text.strip_suffix(self.post_unit).unwrap_or(text).trim_end();
        }
        (self.parser)(text)
    }

    /// Format a value without units
    pub fn print(&self, value: T) -> String {
        (self.printer)(value)
    }

    /// Format a value with its units
    pub fn print_with_units(&self, value: T) -> String {
        format!("{}{}{}", self.pre_unit, self.print(value), self.post_unit)
    }

    pub fn pre_unit(&self) -> &'static str {
        self.pre_unit
    }

    pub fn post_unit(&self) -> &'static str {
        self.post_unit
    }
}

impl PrintMapping<bool> {
    /// Two labels, matched case-insensitively when parsing
    pub fn boolean(true_text: &'static str, false_text: &'static str) -> Self {
        Self::new(
            move |text| {
                if text.eq_ignore_ascii_case(true_text) {
                    Some(true)
                } else if text.eq_ignore_ascii_case(false_text) {
                    Some(false)
                } else {
                    None
                }
            },
            move |value| {
                if value {
                    true_text.to_string()
                } else {
                    false_text.to_string()
                }
            },
            "",
            "",
        )
    }
}

impl PrintMapping<i32> {
    pub fn integer(post_unit: &'static str) -> Self {
        Self::new(
            |text| {
                text.parse::<i32>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|v| v.round() as i32))
            },
            |value| value.to_string(),
            "",
            post_unit,
        )
    }
}

impl PrintMapping<f64> {
    /// Fixed-precision float; infinities print as `-∞` / `∞`
    pub fn float(precision: usize, pre_unit: &'static str, post_unit: &'static str) -> Self {
        Self::new(
            parse_float,
            move |value| format_float(value, precision),
            pre_unit,
            post_unit,
        )
    }

    /// Like [`float`](Self::float) but switches to a `k` suffix from 1000 up
    pub fn small_float(precision: usize, post_unit: &'static str) -> Self {
        Self::new(
            |text| {
                let text = text.trim();
                match text.strip_suffix('k').or_else(|| text.strip_suffix('K')) {
                    Some(number) => parse_float(number.trim()).map(|v| v * 1000.0),
                    None => parse_float(text),
                }
            },
            move |value| {
                if value.is_finite() && value.abs() >= 1000.0 {
                    format!("{}k", format_float(value / 1000.0, precision))
                } else {
                    format_float(value, precision)
                }
            },
            "",
            post_unit,
        )
    }

    /// Unipolar value shown as a percentage
    pub fn unipolar_percent() -> Self {
        Self::new(
            |text| parse_float(text).map(|v| v / 100.0),
            |value| format_float(value * 100.0, 1),
            "",
            "%",
        )
    }
}

impl<T> fmt::Debug for PrintMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintMapping")
            .field("pre_unit", &self.pre_unit)
            .field("post_unit", &self.post_unit)
            .finish_non_exhaustive()
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text.trim() {
        "-∞" | "-inf" => Some(f64::NEG_INFINITY),
        "∞" | "inf" => Some(f64::INFINITY),
        number => number.parse::<f64>().ok().filter(|v| !v.is_nan()),
    }
}

fn format_float(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "N/A".to_string()
    } else if value == f64::NEG_INFINITY {
        "-∞".to_string()
    } else if value == f64::INFINITY {
        "∞".to_string()
    } else {
        format!("{value:.precision$}")
    }
}
