//! GST token lexer
//!
//! Gantree: L3_Parse → Lexer
//!
//! Splits one step of a gate line, `(1)x(2)t100`, into raw gates. No
//! channel map is consulted here; that happens in the line parser.

use awgc_core::{AwgcError, AwgcResult, ChannelIndex, Degrees, Nanoseconds, RotationKind};
use std::fmt;

/// Operation as written, before it is bound to a core
/// Gantree: RawOp // 원시 연산
#[derive(Debug, Clone, PartialEq)]
pub enum RawOp {
    /// `x`, `y`, `xx`, ...
    Rotation(RotationKind),
    /// `p`
    Plunger,
    /// `t<ns>`
    Wait(Nanoseconds),
    /// `z<deg>`
    VirtualZ(Degrees),
    /// `*<label>[v0,v1,...]`
    Arbitrary {
        /// Label
        label: String,
        /// Bracket values, duration first
        values: Vec<f64>,
    },
}

/// One `(<idx>)<op><payload>` gate
#[derive(Debug, Clone, PartialEq)]
pub struct RawGate {
    /// GST index
    pub channel: ChannelIndex,
    /// Operation
    pub op: RawOp,
    /// Source text of the gate
    pub text: String,
}

impl fmt::Display for RawGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Lex one step into its gates
/// Gantree: lex_step(line, text) -> Result<Vec<RawGate>> // 토큰 분리
pub fn lex_step(line: usize, step: &str) -> AwgcResult<Vec<RawGate>> {
    let chars: Vec<char> = step.chars().filter(|c| !c.is_whitespace()).collect();
    let mut gates = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let start = pos;
        if chars[pos] != '(' {
            let rest: String = chars[pos..].iter().collect();
            return Err(AwgcError::parse(line, rest, "expected '(' before gate index"));
        }

        let close = match chars[pos..].iter().position(|&c| c == ')') {
            Some(offset) => pos + offset,
            None => {
                let rest: String = chars[pos..].iter().collect();
                return Err(AwgcError::parse(line, rest, "unmatched parenthesis"));
            }
        };

        // op body runs to the next '(' outside brackets
        let mut end = close + 1;
        let mut depth = 0i32;
        while end < chars.len() {
            match chars[end] {
                '[' => depth += 1,
                ']' => depth -= 1,
                '(' if depth == 0 => break,
                _ => {}
            }
            end += 1;
        }

        let text: String = chars[start..end].iter().collect();
        let index: String = chars[start + 1..close].iter().collect();
        let body: String = chars[close + 1..end].iter().collect();

        let channel = index
            .parse::<ChannelIndex>()
            .map_err(|_| AwgcError::parse(line, &text, format!("invalid gate index '{}'", index)))?;
        let op = lex_op(line, &text, &body)?;

        gates.push(RawGate { channel, op, text });
        pos = end;
    }

    Ok(gates)
}

fn lex_op(line: usize, text: &str, body: &str) -> AwgcResult<RawOp> {
    if body.contains('(') || body.contains(')') {
        return Err(AwgcError::parse(line, text, "unmatched parenthesis"));
    }
    if let Some(kind) = RotationKind::from_op_code(body) {
        return Ok(RawOp::Rotation(kind));
    }
    if body == "p" {
        return Ok(RawOp::Plunger);
    }
    if let Some(payload) = body.strip_prefix('t') {
        let ns = number(line, text, strip_qualifier(payload))?;
        if ns < 0.0 {
            return Err(AwgcError::parse(line, text, "negative wait"));
        }
        return Ok(RawOp::Wait(ns));
    }
    if let Some(payload) = body.strip_prefix('z') {
        return Ok(RawOp::VirtualZ(number(line, text, strip_qualifier(payload))?));
    }
    if let Some(rest) = body.strip_prefix('*') {
        return lex_arbitrary(line, text, rest);
    }
    if body.is_empty() {
        return Err(AwgcError::parse(line, text, "missing op code"));
    }
    Err(AwgcError::parse(line, text, format!("unknown op '{}'", body)))
}

fn lex_arbitrary(line: usize, text: &str, rest: &str) -> AwgcResult<RawOp> {
    let (open, close) = match (rest.find('['), rest.rfind(']')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(AwgcError::parse(line, text, "arbitrary waveform needs '[...]'")),
    };
    if rest[open + 1..close].contains(['[', ']']) || rest[..open].contains(']') {
        return Err(AwgcError::parse(line, text, "unmatched bracket"));
    }
    if !strip_qualifier(&rest[close + 1..]).is_empty() {
        return Err(AwgcError::parse(line, text, "unexpected text after ']'"));
    }

    let label = &rest[..open];
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AwgcError::parse(line, text, "arbitrary waveform label must be alphanumeric"));
    }

    let values = rest[open + 1..close]
        .split(',')
        .map(|v| number(line, text, v))
        .collect::<AwgcResult<Vec<f64>>>()?;
    if values[0] <= 0.0 {
        return Err(AwgcError::parse(line, text, "arbitrary waveform duration must be positive"));
    }

    Ok(RawOp::Arbitrary {
        label: label.to_string(),
        values,
    })
}

/// Drop a single trailing ASCII letter qualifier, `45z` → `45`
fn strip_qualifier(payload: &str) -> &str {
    match payload.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => &payload[..payload.len() - 1],
        _ => payload,
    }
}

fn number(line: usize, text: &str, payload: &str) -> AwgcResult<f64> {
    match payload.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AwgcError::parse(
            line,
            text,
            format!("'{}' is not a number", payload),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
