use serde_json::{json, Value};

use crate::error::CommandError;
use crate::types::Cell;

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedClientMessage {
    Step,
    Reset { seed: Option<u32> },
    RevealPoi { cell: Cell },
    CheckPoiInFire { cell: Cell },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "step" => Some(ParsedClientMessage::Step),
        "reset" => {
            let seed = match object.get("seed") {
                None | Some(Value::Null) => None,
                Some(value) => Some(u32::try_from(value.as_u64()?).ok()?),
            };
            Some(ParsedClientMessage::Reset { seed })
        }
        "reveal_poi" => Some(ParsedClientMessage::RevealPoi {
            cell: parse_json_cell(object.get("x")?, object.get("y")?)?,
        }),
        "check_poi_in_fire" => Some(ParsedClientMessage::CheckPoiInFire {
            cell: parse_json_cell(object.get("x")?, object.get("y")?)?,
        }),
        _ => None,
    }
}

fn parse_json_cell(x: &Value, y: &Value) -> Option<Cell> {
    let x = i32::try_from(x.as_i64()?).ok()?;
    let y = i32::try_from(y.as_i64()?).ok()?;
    Some(Cell::new(x, y))
}

pub fn parse_coords(x: Option<&str>, y: Option<&str>) -> Result<Cell, CommandError> {
    let x = parse_coordinate("x", x)?;
    let y = parse_coordinate("y", y)?;
    Ok(Cell::new(x, y))
}

fn parse_coordinate(field: &'static str, raw: Option<&str>) -> Result<i32, CommandError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CommandError::MissingCoordinate(field))?;
    raw.parse::<i32>()
        .map_err(|_| CommandError::InvalidCoordinate {
            field,
            raw: raw.to_string(),
        })
}

pub fn failure_body(error: &CommandError) -> Value {
    json!({
        "success": false,
        "message": error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_step_and_reset_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"step"}"#),
            Some(ParsedClientMessage::Step)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"reset"}"#),
            Some(ParsedClientMessage::Reset { seed: None })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"reset","seed":42}"#),
            Some(ParsedClientMessage::Reset { seed: Some(42) })
        );
    }

    #[test]
    fn parse_reset_rejects_out_of_range_seed() {
        assert!(parse_client_message(r#"{"type":"reset","seed":-1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"reset","seed":4294967296}"#).is_none());
        assert!(parse_client_message(r#"{"type":"reset","seed":"7"}"#).is_none());
    }

    #[test]
    fn parse_reveal_requires_integer_coordinates() {
        assert_eq!(
            parse_client_message(r#"{"type":"reveal_poi","x":3,"y":1}"#),
            Some(ParsedClientMessage::RevealPoi {
                cell: Cell::new(3, 1)
            })
        );
        assert!(parse_client_message(r#"{"type":"reveal_poi","x":3}"#).is_none());
        assert!(parse_client_message(r#"{"type":"reveal_poi","x":1.5,"y":1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"check_poi_in_fire","x":"a","y":1}"#).is_none());
    }

    #[test]
    fn unknown_or_malformed_messages_are_ignored() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"{"type":"dance"}"#).is_none());
        assert!(parse_client_message(r#"["step"]"#).is_none());
    }

    #[test]
    fn form_coordinates_are_parsed_and_trimmed() {
        assert_eq!(parse_coords(Some("2"), Some(" 5 ")), Ok(Cell::new(2, 5)));
        assert_eq!(parse_coords(Some("-1"), Some("0")), Ok(Cell::new(-1, 0)));
    }

    #[test]
    fn malformed_form_coordinates_are_structured_failures() {
        assert_eq!(
            parse_coords(None, Some("1")),
            Err(CommandError::MissingCoordinate("x"))
        );
        assert_eq!(
            parse_coords(Some("1"), Some("")),
            Err(CommandError::MissingCoordinate("y"))
        );
        assert_eq!(
            parse_coords(Some("one"), Some("1")),
            Err(CommandError::InvalidCoordinate {
                field: "x",
                raw: "one".to_string()
            })
        );
    }

    #[test]
    fn failure_body_carries_the_message() {
        let body = failure_body(&CommandError::GameOver);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "game is over");
    }
}
