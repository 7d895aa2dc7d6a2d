use serde_json::Value;

use crate::types::{Cell, Direction};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start {
        level: Option<i64>,
        seed: Option<i64>,
        cell_size: Option<f64>,
        viewport: Option<Viewport>,
    },
    Move {
        target: Cell,
    },
    Step {
        dir: Direction,
    },
    Pause,
    Resume,
    Resize {
        cell_size: Option<f64>,
        viewport: Option<Viewport>,
    },
    Leave,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let level = parse_optional_i64(object.get("level"))?;
            let seed = parse_optional_i64(object.get("seed"))?;
            let cell_size = parse_optional_f64(object.get("cellSize"))?;
            let viewport = parse_optional_viewport(object.get("viewport"))?;
            Some(ParsedClientMessage::Start {
                level,
                seed,
                cell_size,
                viewport,
            })
        }
        "move" => {
            let x = parse_optional_i64(object.get("x"))??;
            let y = parse_optional_i64(object.get("y"))??;
            let target = Cell::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?);
            Some(ParsedClientMessage::Move { target })
        }
        "step" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Step { dir })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "resume" => Some(ParsedClientMessage::Resume),
        "resize" => {
            let cell_size = parse_optional_f64(object.get("cellSize"))?;
            let viewport = parse_optional_viewport(object.get("viewport"))?;
            if cell_size.is_none() && viewport.is_none() {
                return None;
            }
            Some(ParsedClientMessage::Resize {
                cell_size,
                viewport,
            })
        }
        "leave" => Some(ParsedClientMessage::Leave),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

fn parse_optional_f64(value: Option<&Value>) -> Option<Option<f64>> {
    let Some(value) = value else {
        return Some(None);
    };
    let number = value.as_f64()?;
    number.is_finite().then_some(Some(number))
}

fn parse_optional_viewport(value: Option<&Value>) -> Option<Option<Viewport>> {
    let Some(value) = value else {
        return Some(None);
    };
    let object = value.as_object()?;
    let width = parse_optional_f64(object.get("width"))??;
    let height = parse_optional_f64(object.get("height"))??;
    Some(Some(Viewport { width, height }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"start","level":3,"seed":99,"viewport":{"width":800,"height":600}}"#,
        )
        .expect("start message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                level: Some(3),
                seed: Some(99),
                cell_size: None,
                viewport: Some(Viewport {
                    width: 800.0,
                    height: 600.0
                }),
            }
        );
    }

    #[test]
    fn parse_start_without_fields() {
        assert_eq!(
            parse_client_message(r#"{"type":"start"}"#),
            Some(ParsedClientMessage::Start {
                level: None,
                seed: None,
                cell_size: None,
                viewport: None,
            })
        );
    }

    #[test]
    fn parse_move_floors_and_requires_both_axes() {
        assert_eq!(
            parse_client_message(r#"{"type":"move","x":2.7,"y":4}"#),
            Some(ParsedClientMessage::Move {
                target: Cell::new(2, 4)
            })
        );
        assert!(parse_client_message(r#"{"type":"move","x":2}"#).is_none());
        assert!(parse_client_message(r#"{"type":"move","x":"2","y":1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"move","x":1e12,"y":1}"#).is_none());
    }

    #[test]
    fn parse_step_rejects_invalid_direction() {
        assert_eq!(
            parse_client_message(r#"{"type":"step","dir":"left"}"#),
            Some(ParsedClientMessage::Step {
                dir: Direction::Left
            })
        );
        assert!(parse_client_message(r#"{"type":"step","dir":"sideways"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"step"}"#).is_none());
    }

    #[test]
    fn parse_resize_needs_a_size_hint() {
        assert_eq!(
            parse_client_message(r#"{"type":"resize","cellSize":32.5}"#),
            Some(ParsedClientMessage::Resize {
                cell_size: Some(32.5),
                viewport: None,
            })
        );
        assert!(parse_client_message(r#"{"type":"resize"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"resize","viewport":{"width":10}}"#).is_none());
    }

    #[test]
    fn parse_control_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"pause"}"#),
            Some(ParsedClientMessage::Pause)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"resume"}"#),
            Some(ParsedClientMessage::Resume)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"leave"}"#),
            Some(ParsedClientMessage::Leave)
        );
        assert!(parse_client_message(r#"{"type":"dance"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn parse_start_rejects_overflow_numbers() {
        let parsed = parse_client_message(r#"{"type":"start","level":18446744073709551615}"#);
        assert!(parsed.is_none());

        let parsed = parse_client_message(r#"{"type":"start","seed":1e100}"#);
        assert!(parsed.is_none());
    }
}
