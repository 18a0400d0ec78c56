use mid2bar_ports::{LyricLineRow, PlayerSettings, SettingsError, Volume100};
use pretty_assertions::assert_eq;

#[test]
fn settings_file_keys_override_defaults() {
    let json = r#"{
        "PREVIEW_TIME": 1.5,
        "MIC_INPUT_DELAY": 0.25,
        "BAR_AUTO_PLAY_CHANNELS": [3],
        "HIDE_NOW_BAR_WHEN_NO_NOTES": false,
        "BG_COLOR": [20, 20, 40]
    }"#;
    let settings: PlayerSettings = serde_json::from_str(json).expect("settings should parse");

    assert_eq!(settings.preview_time, 1.5);
    assert_eq!(settings.mic_input_delay, 0.25);
    assert_eq!(settings.bar_auto_play_channels, vec![3]);
    assert!(!settings.hide_now_bar_when_no_notes);
    assert_eq!(settings.remain_time, PlayerSettings::default().remain_time);
    assert!(settings.validate().is_ok());
}

#[test]
fn validate_rejects_zero_connect_duration() {
    let settings = PlayerSettings {
        mic_input_note_connect_duration: 0.0,
        ..PlayerSettings::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::Invalid {
            key: "MIC_INPUT_NOTE_CONNECT_DURATION",
            ..
        })
    ));
}

#[test]
fn validate_rejects_short_note_name_table() {
    let settings = PlayerSettings {
        note_names: vec!["C".to_string()],
        ..PlayerSettings::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn default_score_ratios_sum_to_one() {
    let settings = PlayerSettings::default();
    assert!((settings.score_ratio_sum() - 1.0).abs() < 1e-12);
}

#[test]
fn volume_steps_are_clamped() {
    assert_eq!(Volume100::new(99).step(5).get(), 100);
    assert_eq!(Volume100::new(1).step(-5).get(), 0);
}

#[test]
fn lyric_rows_parse_wipe_arrays() {
    let json = r#"{
        "fade_in": {"start": 0.0, "end": 0.5},
        "background_main_lyric": {"start": 0.0, "end": 4.0, "x": 10, "y": 20,
            "x_wipes": [[1.0, 2.0, 0, 100]], "clip_up": 2, "clip_bottom": 3, "image": "a.png"},
        "front_main_lyric": {"start": 0.0, "end": 4.0, "x": 10, "y": 20, "x_wipes": []},
        "background_ruby": {"start": 0.0, "end": 4.0, "x": 10, "y": 0, "x_wipes": []},
        "front_ruby": {"start": 0.0, "end": 4.0, "x": 10, "y": 0, "x_wipes": []}
    }"#;
    let line: LyricLineRow = serde_json::from_str(json).expect("lyric row should parse");
    assert_eq!(line.background_main_lyric.x_wipes[0].x_to(), 100.0);
    assert!(line.fade_out.is_none());
}
