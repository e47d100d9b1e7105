// Author: Dustin Pilgrim
// License: MIT

//! Leaf coercion: strict grammars for the scalar kinds a string may decode to.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, XonError};

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:0|[1-9](?:_?[0-9])*)$").expect("decimal grammar"));

static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?0[xX][0-9a-fA-F](?:_?[0-9a-fA-F])*$").expect("hex grammar"));

static OCTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?0[oO][0-7](?:_?[0-7])*$").expect("octal grammar"));

static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[+-]?",
        r"(?:[0-9](?:_?[0-9])*(?:\.(?:[0-9](?:_?[0-9])*)?)?|\.[0-9](?:_?[0-9])*)",
        r"(?:[eE][+-]?[0-9](?:_?[0-9])*)?$",
    ))
    .expect("float grammar")
});

pub fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XonError::coercion(text, "bool").with_hint("Booleans are exactly `true` or `false`")),
    }
}

/// A syntactically valid integer literal. `magnitude` is `None` when it does
/// not fit in 128 bits.
struct IntLiteral {
    negative: bool,
    magnitude: Option<u128>,
}

fn parse_integer(text: &str) -> Option<IntLiteral> {
    let radix = if DECIMAL.is_match(text) {
        10
    } else if HEX.is_match(text) {
        16
    } else if OCTAL.is_match(text) {
        8
    } else {
        return None;
    };

    let (negative, unsigned) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let body = if radix == 10 { unsigned } else { &unsigned[2..] };
    let digits: String = body.chars().filter(|c| *c != '_').collect();
    Some(IntLiteral { negative, magnitude: u128::from_str_radix(&digits, radix).ok() })
}

fn not_an_integer(text: &str, target: &'static str) -> XonError {
    let err = XonError::coercion(text, target);
    let unsigned = text.trim_start_matches(['+', '-']);
    if unsigned.len() > 1 && unsigned.starts_with('0') && unsigned.as_bytes()[1].is_ascii_digit() {
        err.with_hint("Leading zeros are not allowed; write octal as 0o755")
    } else {
        err.with_hint("Integers are decimal, 0x hex or 0o octal, with '_' only between digits")
    }
}

fn out_of_range(text: &str, target: &'static str) -> XonError {
    XonError::TypeCoercion {
        key: None,
        literal: format!("\"{}\"", text),
        target: target.to_string(),
        position: None,
        hint: Some(format!("The value is out of range for {}", target)),
        code: Some(406),
    }
}

pub fn parse_signed(text: &str, target: &'static str, min: i128, max: i128) -> Result<i128> {
    let literal = parse_integer(text).ok_or_else(|| not_an_integer(text, target))?;
    let magnitude = literal.magnitude.ok_or_else(|| out_of_range(text, target))?;
    let value = if literal.negative {
        if magnitude > i128::MIN.unsigned_abs() {
            return Err(out_of_range(text, target));
        }
        0i128.wrapping_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).map_err(|_| out_of_range(text, target))?
    };
    if value < min || value > max {
        return Err(out_of_range(text, target));
    }
    Ok(value)
}

pub fn parse_unsigned(text: &str, target: &'static str, max: u128) -> Result<u128> {
    let literal = parse_integer(text).ok_or_else(|| not_an_integer(text, target))?;
    let magnitude = literal.magnitude.ok_or_else(|| out_of_range(text, target))?;
    if (literal.negative && magnitude != 0) || magnitude > max {
        return Err(out_of_range(text, target));
    }
    Ok(magnitude)
}

/// Special values are lowercase only: `nan`, `inf`, `+inf`, `-inf`.
fn special_float(text: &str) -> Option<f64> {
    match text {
        "nan" => Some(f64::NAN),
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn float_digits(text: &str, target: &'static str) -> Result<String> {
    if !FLOAT.is_match(text) {
        return Err(XonError::coercion(text, target)
            .with_hint("Floats look like 1.5, .5, 1., 2e10 or nan, inf, -inf"));
    }
    Ok(text.chars().filter(|c| *c != '_').collect())
}

pub fn parse_f64(text: &str) -> Result<f64> {
    if let Some(special) = special_float(text) {
        return Ok(special);
    }
    let digits = float_digits(text, "f64")?;
    let value: f64 = digits.parse().map_err(|_| XonError::coercion(text, "f64"))?;
    if value.is_infinite() {
        return Err(out_of_range(text, "f64"));
    }
    Ok(value)
}

pub fn parse_f32(text: &str) -> Result<f32> {
    if let Some(special) = special_float(text) {
        return Ok(special as f32);
    }
    let digits = float_digits(text, "f32")?;
    let value: f32 = digits.parse().map_err(|_| XonError::coercion(text, "f32"))?;
    if value.is_infinite() {
        return Err(out_of_range(text, "f32"));
    }
    Ok(value)
}

pub fn parse_char(text: &str) -> Result<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(XonError::coercion(text, "char")),
    }
}
