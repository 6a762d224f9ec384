//! RWS response decoder, spec §4.3: parses the controller's XHTML response
//! body into typed records.
//!
//! Per spec §9's redesign note this replaces ad-hoc tree traversal with one
//! function per resource. Regex is used only to pull scalar span text out
//! of otherwise-fixed-shape XHTML fragments, never to parse the
//! jointtarget/robtarget bracket syntax (that's `rws::value`).

use crate::error::RwsError;
use crate::models::{
    JointTarget, LogMessageType, RapidEventLogEntry, RapidExecutionState, RapidIpcMessage,
    RapidSignal, RobTarget, RobTargetConfig,
};
use crate::units::{deg_to_rad, mm_to_m};
use regex::Regex;

fn extract_span(html: &str, class: &str) -> Option<String> {
    let pattern = format!(r#"<span\s+class="{class}">(.*?)</span>"#);
    let re = Regex::new(&pattern).ok()?;
    re.captures(html)
        .map(|c| c.get(1).unwrap().as_str().trim().to_owned())
}

/// Like [`extract_span`] but also returns the byte offset the match starts
/// at, so callers can check the order spans actually appear in the document.
fn extract_span_at(html: &str, class: &str) -> Option<(usize, String)> {
    let pattern = format!(r#"<span\s+class="{class}">(.*?)</span>"#);
    let re = Regex::new(&pattern).ok()?;
    let m = re.captures(html)?;
    let whole = m.get(0).unwrap();
    let text = m.get(1).unwrap().as_str().trim().to_owned();
    Some((whole.start(), text))
}

fn require_span(html: &str, class: &str) -> Result<String, RwsError> {
    extract_span(html, class).ok_or_else(|| RwsError::protocol(class, "missing span"))
}

fn parse_int(field: &str, text: &str) -> Result<i64, RwsError> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| RwsError::protocol(field, e.to_string()))
}

fn parse_float(field: &str, text: &str) -> Result<f64, RwsError> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| RwsError::protocol(field, e.to_string()))
}

/// Error body decode: `<span class="code">` + optional `<span class="msg">`.
pub fn decode_error_body(html: &str) -> Option<(i64, Option<String>)> {
    let code = extract_span(html, "code")?.parse::<i64>().ok()?;
    let message = extract_span(html, "msg");
    Some((code, message))
}

pub fn decode_execution_state(html: &str) -> Result<RapidExecutionState, RwsError> {
    Ok(RapidExecutionState {
        ctrlexecstate: require_span(html, "ctrlexecstate")?,
        cycle: require_span(html, "cycle")?,
    })
}

pub fn decode_controller_state(html: &str) -> Result<String, RwsError> {
    require_span(html, "ctrlstate")
}

pub fn decode_operation_mode(html: &str) -> Result<String, RwsError> {
    require_span(html, "opmode")
}

/// RMMP poll/request response decode: `<span class="status">`, spec §4.4.
pub fn decode_rmmp_status(html: &str) -> Result<String, RwsError> {
    require_span(html, "status")
}

/// Digital I/O string encoding: `"1"` ↔ true, `"0"` ↔ false (spec §6); the
/// RWS operation table returns the raw level as an int.
pub fn decode_digital_io(html: &str) -> Result<i64, RwsError> {
    parse_int("lvalue", &require_span(html, "lvalue")?)
}

pub fn decode_rapid_variable(html: &str) -> Result<String, RwsError> {
    require_span(html, "value")
}

/// Jointtarget decode: six axes from `rax_1..rax_6`, asserted ascending
/// during parse (i.e. each axis's span must appear later in the document
/// than the previous one); optional external axes `eax_a..eax_f`.
pub fn decode_jointtarget(html: &str) -> Result<JointTarget, RwsError> {
    let axis_names = ["rax_1", "rax_2", "rax_3", "rax_4", "rax_5", "rax_6"];
    let mut robax = [0.0f64; 6];
    let mut last_offset: Option<usize> = None;
    for (i, name) in axis_names.iter().enumerate() {
        let (offset, text) = extract_span_at(html, name)
            .ok_or_else(|| RwsError::protocol(name, "missing span"))?;
        if let Some(last) = last_offset {
            if offset <= last {
                return Err(RwsError::protocol(
                    name,
                    format!("jointtarget axes out of order: {name} precedes the previous axis"),
                ));
            }
        }
        last_offset = Some(offset);

        let deg = parse_float(name, &text)?;
        robax[i] = deg_to_rad(deg);
    }

    let eax_names = ["eax_a", "eax_b", "eax_c", "eax_d", "eax_e", "eax_f"];
    let mut extax = Vec::with_capacity(6);
    for name in eax_names {
        match extract_span(html, name) {
            Some(text) => extax.push(deg_to_rad(parse_float(name, &text)?)),
            None => break,
        }
    }
    let extax = if extax.is_empty() { None } else { Some(extax) };

    Ok(JointTarget { robax, extax })
}

/// Robtarget decode: translation `x,y,z` (mm→m), quaternion `q1..q4`,
/// configuration `cf1,cf4,cf6,cfx`, external axes `eax_a..eax_f` (deg→rad).
pub fn decode_robtarget(html: &str) -> Result<RobTarget, RwsError> {
    let x = mm_to_m(parse_float("x", &require_span(html, "x")?)?);
    let y = mm_to_m(parse_float("y", &require_span(html, "y")?)?);
    let z = mm_to_m(parse_float("z", &require_span(html, "z")?)?);

    let q1 = parse_float("q1", &require_span(html, "q1")?)?;
    let q2 = parse_float("q2", &require_span(html, "q2")?)?;
    let q3 = parse_float("q3", &require_span(html, "q3")?)?;
    let q4 = parse_float("q4", &require_span(html, "q4")?)?;

    let config = RobTargetConfig {
        cf1: parse_int("cf1", &require_span(html, "cf1")?)? as i32,
        cf4: parse_int("cf4", &require_span(html, "cf4")?)? as i32,
        cf6: parse_int("cf6", &require_span(html, "cf6")?)? as i32,
        cfx: parse_int("cfx", &require_span(html, "cfx")?)? as i32,
    };

    let mut extax = Vec::with_capacity(6);
    for name in ["eax_a", "eax_b", "eax_c", "eax_d", "eax_e", "eax_f"] {
        match extract_span(html, name) {
            Some(text) => extax.push(deg_to_rad(parse_float(name, &text)?)),
            None => break,
        }
    }

    Ok(RobTarget {
        translation: [x, y, z],
        rotation: [q1, q2, q3, q4],
        config,
        extax,
    })
}

fn list_items(html: &str) -> Vec<String> {
    let re = Regex::new(r"(?s)<li[^>]*>(.*?)</li>").unwrap();
    re.captures_iter(html)
        .map(|c| c.get(1).unwrap().as_str().to_owned())
        .collect()
}

/// Event-log decode: one entry per `<li>`, spec §4.3.
pub fn decode_event_log(html: &str) -> Result<Vec<RapidEventLogEntry>, RwsError> {
    let mut out = Vec::new();
    for item in list_items(html) {
        let find = |class: &str| require_span(&item, class);

        let code_raw = parse_int("code", &find("code")?)?;
        let msg_type_raw = parse_int("msgtype", &find("msgtype")?)?;
        let msg_type = LogMessageType::from_code(msg_type_raw).ok_or_else(|| {
            RwsError::protocol("msgtype", format!("unknown message type {msg_type_raw}"))
        })?;
        let tstamp_text = find("tstamp")?;
        let timestamp =
            chrono::NaiveDateTime::parse_from_str(&tstamp_text, "%Y-%m-%d T  %H:%M:%S")
                .map_err(|e| RwsError::protocol("tstamp", e.to_string()))?;

        let argc = parse_int("argc", &find("argc")?)? as usize;
        let mut args = Vec::with_capacity(argc);
        for i in 1..=argc {
            args.push(find(&format!("arg{i}"))?);
        }

        out.push(RapidEventLogEntry {
            msg_type,
            code: code_raw,
            timestamp,
            args,
            title: find("title")?,
            description: find("desc")?,
            consequences: find("conseqs")?,
            causes: find("causes")?,
            actions: find("actions")?,
        });
    }
    Ok(out)
}

/// IPC message decode: one entry per `<li>`, fields
/// `dipc-msgtype`/`dipc-cmd`/`dipc-userdef`/`dipc-data`.
pub fn decode_ipc_messages(html: &str) -> Result<Vec<RapidIpcMessage>, RwsError> {
    let mut out = Vec::new();
    for item in list_items(html) {
        out.push(RapidIpcMessage {
            payload: require_span(&item, "dipc-data")?,
            userdef: parse_int("dipc-userdef", &require_span(&item, "dipc-userdef")?)?,
            msgtype: parse_int("dipc-msgtype", &require_span(&item, "dipc-msgtype")?)?,
            cmd: parse_int("dipc-cmd", &require_span(&item, "dipc-cmd")?)?,
        });
    }
    Ok(out)
}

/// Rapid persistent-variable subscription decode: variable names pulled
/// from `href`s matching `/rw/rapid/symbol/data/RAPID/T_ROB1/<name>;value`,
/// spec §4.5.
pub fn decode_rapid_variable_names(html: &str) -> Result<Vec<String>, RwsError> {
    let re = Regex::new(r"/rw/rapid/symbol/data/RAPID/T_ROB1/([^;\"]+);value")
        .expect("static regex is valid");
    Ok(re
        .captures_iter(html)
        .map(|c| c.get(1).unwrap().as_str().to_owned())
        .collect())
}

/// Event-log subscription decode: the ordered list of integer `seqnum`
/// values, spec §4.5.
pub fn decode_event_log_seqnums(html: &str) -> Result<Vec<i64>, RwsError> {
    list_items(html)
        .into_iter()
        .map(|item| parse_int("seqnum", &require_span(&item, "seqnum")?))
        .collect()
}

/// Digital-signal subscription event decode: one `{name, lvalue}` per
/// `<li title="...">`, spec §4.5 scenario 6.
pub fn decode_signal_events(html: &str) -> Result<Vec<RapidSignal>, RwsError> {
    let li_re = Regex::new(r#"(?s)<li[^>]*title="([^"]*)"[^>]*>(.*?)</li>"#).unwrap();
    let mut out = Vec::new();
    for caps in li_re.captures_iter(html) {
        let name = caps.get(1).unwrap().as_str().to_owned();
        let body = caps.get(2).unwrap().as_str();
        let lvalue = parse_float("lvalue", &require_span(body, "lvalue")?)?;
        out.push(RapidSignal { name, lvalue });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_state_decodes() {
        let html = r#"<span class="ctrlexecstate">running</span><span class="cycle">forever</span>"#;
        let state = decode_execution_state(html).unwrap();
        assert_eq!(state.ctrlexecstate, "running");
        assert_eq!(state.cycle, "forever");
    }

    #[test]
    fn error_body_extracts_code_and_message() {
        let html = r#"<span class="code">-600</span><span class="msg">Start rejected</span>"#;
        let (code, msg) = decode_error_body(html).unwrap();
        assert_eq!(code, -600);
        assert_eq!(msg.as_deref(), Some("Start rejected"));
    }

    #[test]
    fn event_log_parses_single_entry() {
        let html = r#"
            <ul>
            <li>
              <span class="msgtype">2</span>
              <span class="code">10001</span>
              <span class="tstamp">2024-05-01 T  12:34:56</span>
              <span class="title">Example</span>
              <span class="desc">desc</span>
              <span class="conseqs">conseqs</span>
              <span class="causes">causes</span>
              <span class="actions">actions</span>
              <span class="argc">1</span>
              <span class="arg1">foo</span>
            </li>
            </ul>
        "#;
        let entries = decode_event_log(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].msg_type, LogMessageType::Warning);
        assert_eq!(entries[0].args, vec!["foo".to_owned()]);
        assert_eq!(
            entries[0].timestamp,
            chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 34, 56)
                .unwrap()
        );
    }

    #[test]
    fn digital_signal_events_decode() {
        let html = r#"<li title="DO_1"><span class="lvalue">1</span></li>"#;
        let signals = decode_signal_events(html).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].name, "DO_1");
        assert_eq!(signals[0].lvalue, 1.0);
    }

    #[test]
    fn jointtarget_decode_converts_degrees() {
        let html = r#"
            <span class="rax_1">10</span><span class="rax_2">20</span>
            <span class="rax_3">30</span><span class="rax_4">40</span>
            <span class="rax_5">50</span><span class="rax_6">60</span>
        "#;
        let jt = decode_jointtarget(html).unwrap();
        assert!((jt.robax[0] - std::f64::consts::PI / 18.0).abs() < 1e-9);
        assert!(jt.extax.is_none());
    }

    #[test]
    fn jointtarget_decode_rejects_out_of_order_axes() {
        let html = r#"
            <span class="rax_2">20</span><span class="rax_1">10</span>
            <span class="rax_3">30</span><span class="rax_4">40</span>
            <span class="rax_5">50</span><span class="rax_6">60</span>
        "#;
        let err = decode_jointtarget(html).unwrap_err();
        assert!(matches!(err, RwsError::Protocol { field, .. } if field == "rax_2"));
    }
}
