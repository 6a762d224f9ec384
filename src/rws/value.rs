//! RWS value codec, spec §4.3: converts between the controller's textual
//! value syntax and typed records.
//!
//! Per spec §9's redesign note, jointtarget/robtarget text is parsed with a
//! small bracket-aware tokenizer rather than regex; regex remains fine for
//! pulling scalar text out of XHTML spans (see `rws::decode`).

use crate::error::RwsError;
use crate::models::JointTarget;
use crate::units::{deg_to_rad, rad_to_deg};

/// Split a bracketed string into its top-level `[...]` groups.
///
/// E.g. `"[1,2],[3,4]"` → `["[1,2]", "[3,4]"]`. Nested brackets inside a
/// group are preserved verbatim; only depth-0→1→0 transitions count.
fn top_level_groups(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut start = None;
    for (i, c) in s.char_indices() {
        match c {
            '[' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(st) = start.take() {
                        out.push(&s[st..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn strip_outer_brackets<'a>(s: &'a str, field: &str) -> Result<&'a str, RwsError> {
    let s = s.trim();
    if !s.starts_with('[') || !s.ends_with(']') || s.len() < 2 {
        return Err(RwsError::protocol(field, format!("not bracketed: {s}")));
    }
    Ok(&s[1..s.len() - 1])
}

/// Parse `"[a,b,c]"` (or `"[]"`) into a vector of `f64`.
pub fn parse_numeric_array(text: &str) -> Result<Vec<f64>, RwsError> {
    let inner = strip_outer_brackets(text, "numeric_array")?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|tok| {
            tok.trim()
                .parse::<f64>()
                .map_err(|e| RwsError::protocol("numeric_array", e.to_string()))
        })
        .collect()
}

/// Render a `f64` array as `"[a,b,c]"` (or `"[]"` when empty).
pub fn encode_numeric_array(values: &[f64]) -> String {
    let body = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

/// Parse `"[a,b,c]"` (or `"[]"`) into a vector of `i64`.
pub fn parse_numeric_array_i64(text: &str) -> Result<Vec<i64>, RwsError> {
    let inner = strip_outer_brackets(text, "numeric_array")?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|tok| {
            tok.trim()
                .parse::<i64>()
                .map_err(|e| RwsError::protocol("numeric_array", e.to_string()))
        })
        .collect()
}

/// Render an `i64` array as `"[a,b,c]"` (or `"[]"` when empty).
pub fn encode_numeric_array_i64(values: &[i64]) -> String {
    let body = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

/// Parse `"[[r1,...,r6],[e1,...]]"` (degrees) into a [`JointTarget`]
/// (radians). The external-axes group may be empty or absent.
pub fn parse_jointtarget_text(text: &str) -> Result<JointTarget, RwsError> {
    let inner = strip_outer_brackets(text, "jointtarget")?;
    let groups = top_level_groups(inner);
    let Some(robax_group) = groups.first() else {
        return Err(RwsError::protocol("jointtarget", "missing robax group"));
    };
    let robax_deg = parse_numeric_array(robax_group)?;
    if robax_deg.len() != 6 {
        return Err(RwsError::protocol(
            "jointtarget.robax",
            format!("expected 6 axes, got {}", robax_deg.len()),
        ));
    }
    let mut robax = [0.0; 6];
    for (i, deg) in robax_deg.iter().enumerate() {
        robax[i] = deg_to_rad(*deg);
    }

    let extax = match groups.get(1) {
        Some(extax_group) => {
            let extax_deg = parse_numeric_array(extax_group)?;
            if extax_deg.is_empty() {
                None
            } else {
                Some(extax_deg.iter().map(|deg| deg_to_rad(*deg)).collect())
            }
        }
        None => None,
    };

    Ok(JointTarget { robax, extax })
}

/// Render a [`JointTarget`] (radians) as `"[[r1,...,r6],[e1,...]]"`
/// (degrees), fixed 4-decimal format.
pub fn encode_jointtarget_text(jt: &JointTarget) -> String {
    let robax = jt
        .robax
        .iter()
        .map(|rad| format!("{:.4}", rad_to_deg(*rad)))
        .collect::<Vec<_>>()
        .join(",");
    let extax = jt
        .extax
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|rad| format!("{:.4}", rad_to_deg(*rad)))
        .collect::<Vec<_>>()
        .join(",");
    format!("[[{robax}],[{extax}]]")
}

/// Parse a jointtarget array: `"[]"` or a sequence of bracketed
/// jointtargets. Generalizes the legacy "split on top-level `],[[`"
/// boundary description into the bracket tokenizer above.
pub fn parse_jointtarget_array(text: &str) -> Result<Vec<JointTarget>, RwsError> {
    let trimmed = text.trim();
    if trimmed == "[]" {
        return Ok(Vec::new());
    }
    let inner = strip_outer_brackets(trimmed, "jointtarget_array")?;
    top_level_groups(inner)
        .into_iter()
        .map(parse_jointtarget_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_array_round_trips() {
        let a = vec![1_i64, 2, -3, 400];
        let text = encode_numeric_array_i64(&a);
        assert_eq!(parse_numeric_array_i64(&text).unwrap(), a);
    }

    #[test]
    fn empty_numeric_array() {
        assert_eq!(parse_numeric_array("[]").unwrap(), Vec::<f64>::new());
        assert_eq!(parse_jointtarget_array("[]").unwrap(), Vec::new());
    }

    #[test]
    fn jointtarget_text_round_trips_within_tolerance() {
        let jt = JointTarget {
            robax: [0.1, -0.2, 0.3, 0.0, std::f64::consts::PI, -1.0],
            extax: None,
        };
        let text = encode_jointtarget_text(&jt);
        let parsed = parse_jointtarget_text(&text).unwrap();
        for i in 0..6 {
            assert!((parsed.robax[i] - jt.robax[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn jointtarget_from_degrees_scenario() {
        // get_jointtarget scenario, spec §8 scenario 4.
        let text = "[[10,20,30,40,50,60],[]]";
        let jt = parse_jointtarget_text(text).unwrap();
        let expected = [
            std::f64::consts::PI / 18.0,
            std::f64::consts::PI / 9.0,
            std::f64::consts::PI / 6.0,
            2.0 * std::f64::consts::PI / 9.0,
            5.0 * std::f64::consts::PI / 18.0,
            std::f64::consts::PI / 3.0,
        ];
        for i in 0..6 {
            assert!((jt.robax[i] - expected[i]).abs() < 1e-9);
        }
        assert!(jt.extax.is_none());
    }
}
