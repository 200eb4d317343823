//! Money formatting for amounts as the backend reports them (decimal
//! currency units).
//!
//! Format: sign + currency symbol + number with thousands separator.
//! Amounts are rounded to cents before formatting so `0.004` prints as zero.
//!
//! Color coding:
//! - Positive amounts (> 0): green
//! - Negative amounts (< 0): red
//! - Zero (= 0): default text color

/// Shown wherever a derived number is not applicable or a value is missing.
pub const PLACEHOLDER: &str = "\u{2013}";

fn to_cents(amount: f64) -> i64 {
    if amount.is_finite() {
        (amount * 100.0).round() as i64
    } else {
        0
    }
}

/// Colored money display. Returns HTML with Tailwind color classes.
pub fn format_money(amount: f64, currency: &str, locale: &str) -> String {
    let (formatted, color_class) = format_money_impl(to_cents(amount), currency, locale);
    format!(r#"<span class="{}">{}</span>"#, color_class, formatted)
}

/// Signed plain text, for variances and exports.
pub fn format_money_plain(amount: f64, currency: &str, locale: &str) -> String {
    let (formatted, _) = format_money_impl(to_cents(amount), currency, locale);
    formatted
}

/// No sign, no color. Used for limits, averages and split totals.
pub fn format_money_neutral(amount: f64, currency: &str, locale: &str) -> String {
    let abs_cents = to_cents(amount).abs();
    let (thousands_sep, decimal_sep) = locale_separators(locale);
    format!(
        "{}{}{}{:02}",
        currency_symbol(currency),
        format_with_thousands(abs_cents / 100, thousands_sep),
        decimal_sep,
        abs_cents % 100
    )
}

/// Unsigned percentage with locale decimal separator, e.g. budget used.
/// Example: 87.5 -> "87.50%" (en-US) or "87,50%" (de-DE)
pub fn format_percent(value: f64, locale: &str) -> String {
    let (_, decimal_sep) = locale_separators(locale);
    let hundredths = to_cents(value.abs());
    let sign = if value < 0.0 && hundredths > 0 { "-" } else { "" };
    format!("{}{}{}{:02}%", sign, hundredths / 100, decimal_sep, hundredths % 100)
}

/// Plain number for form inputs: two decimals, `.` separator, no symbol.
pub fn format_amount_input(amount: f64) -> String {
    format!("{:.2}", to_cents(amount) as f64 / 100.0)
}

fn format_money_impl(cents: i64, currency: &str, locale: &str) -> (String, &'static str) {
    let color_class = if cents > 0 {
        "text-green-600 dark:text-green-400"
    } else if cents < 0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-gray-900 dark:text-gray-100"
    };

    let abs_cents = cents.abs();
    let (thousands_sep, decimal_sep) = locale_separators(locale);
    let whole_str = format_with_thousands(abs_cents / 100, thousands_sep);
    let symbol = currency_symbol(currency);
    let sign = match cents.signum() {
        -1 => "-",
        1 => "+",
        _ => "",
    };

    (
        format!("{}{}{}{}{:02}", sign, symbol, whole_str, decimal_sep, abs_cents % 100),
        color_class,
    )
}

/// Thousands and decimal separators for a locale.
fn locale_separators(locale: &str) -> (char, char) {
    match locale {
        "de-DE" | "de-AT" | "de-CH" | "fr-FR" | "fr-BE" | "fr-CA" | "es-ES" | "es-AR" | "it-IT"
        | "pt-BR" | "pt-PT" | "nl-NL" | "nl-BE" | "pl-PL" | "ru-RU" | "tr-TR" | "da-DK"
        | "nb-NO" | "sv-SE" | "fi-FI" | "cs-CZ" => ('.', ','),
        _ => (',', '.'),
    }
}

fn format_with_thousands(n: i64, sep: char) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(sep);
        }
        result.push(c);
    }
    result
}

fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{00a3}",
        "JPY" => "\u{00a5}",
        "CAD" => "C$",
        "AUD" => "A$",
        "CHF" => "CHF\u{00a0}",
        "INR" => "\u{20b9}",
        "BRL" => "R$",
        "MXN" => "MX$",
        "SEK" => "kr\u{00a0}",
        "NOK" => "kr\u{00a0}",
        "DKK" => "kr\u{00a0}",
        "NZD" => "NZ$",
        _ => "$",
    }
}

/// Currencies offered on the settings page.
pub const CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "INR", "BRL", "MXN", "SEK", "NOK", "DKK",
    "NZD",
];

/// Locales offered on the settings page.
pub const LOCALES: &[&str] = &["en-US", "en-GB", "de-DE", "fr-FR", "es-ES", "nl-NL", "sv-SE"];
