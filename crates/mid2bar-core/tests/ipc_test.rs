use mid2bar_core::{encode_event, parse_command, Command, Event};
use mid2bar_ports::types::Volume100;
use pretty_assertions::assert_eq;

#[test]
fn commands_parse_from_tagged_json() {
    assert_eq!(parse_command(r#"{"type":"Play"}"#).unwrap(), Command::Play);
    assert_eq!(
        parse_command(r#"{"type":"SeekTo","payload":{"seconds":12.5}}"#).unwrap(),
        Command::SeekTo { seconds: 12.5 }
    );
    assert_eq!(
        parse_command(r#"{"type":"SetVolume","payload":{"volume":40}}"#).unwrap(),
        Command::SetVolume {
            volume: Volume100(40)
        }
    );
    assert_eq!(
        parse_command(r#"{"type":"SetMicChannel","payload":{"channel":2}}"#).unwrap(),
        Command::SetMicChannel { channel: 2 }
    );
}

#[test]
fn out_of_range_volume_is_clamped_on_parse() {
    assert_eq!(
        parse_command(r#"{"type":"SetVolume","payload":{"volume":250}}"#).unwrap(),
        Command::SetVolume {
            volume: Volume100(100)
        }
    );
    assert_eq!(
        parse_command(r#"{"type":"SetVolume","payload":{"volume":-3}}"#).unwrap(),
        Command::SetVolume {
            volume: Volume100(0)
        }
    );
}

#[test]
fn unknown_commands_are_rejected() {
    assert!(parse_command(r#"{"type":"Explode"}"#).is_err());
    assert!(parse_command("not json").is_err());
}

#[test]
fn events_encode_with_type_and_payload() {
    let json = encode_event(&Event::PlaybackFinished { time: 90.0 }).unwrap();
    assert_eq!(json, r#"{"type":"PlaybackFinished","payload":{"time":90.0}}"#);

    let json = encode_event(&Event::MicInputChanged {
        enabled: false,
        error: Some("busy".into()),
    })
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "MicInputChanged");
    assert_eq!(value["payload"]["error"], "busy");
}
