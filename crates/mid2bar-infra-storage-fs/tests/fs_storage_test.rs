use mid2bar_infra_storage_fs::FsStorage;
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::storage::{StorageError, StoragePort, TimelineSourcePort};
use mid2bar_ports::tables::{MarkerRow, NoteRow};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mid2bar-fs-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn missing_settings_file_gives_defaults() {
    let storage = FsStorage::new(scratch_dir("missing"));
    assert_eq!(storage.load_settings().unwrap(), PlayerSettings::default());
}

#[test]
fn settings_survive_a_save_and_load() {
    let dir = scratch_dir("save");
    let storage = FsStorage::new(dir.clone());
    let settings = PlayerSettings {
        preview_time: 1.25,
        bar_auto_play: false,
        ..PlayerSettings::default()
    };

    storage.save_settings(&settings).unwrap();
    assert_eq!(storage.load_settings().unwrap(), settings);

    let raw = fs::read_to_string(storage.settings_path()).unwrap();
    assert!(raw.contains("\"PREVIEW_TIME\": 1.25"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn partial_settings_files_keep_other_defaults() {
    let dir = scratch_dir("partial");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("settings.json"),
        r#"{"MIC_INPUT_DELAY": 0.3, "DRAW_TITLE_FONT": "ignored"}"#,
    )
    .unwrap();

    let settings = FsStorage::new(dir.clone()).load_settings().unwrap();
    assert_eq!(settings.mic_input_delay, 0.3);
    assert_eq!(settings.preview_time, PlayerSettings::default().preview_time);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn tables_load_from_json_files() {
    let dir = scratch_dir("tables");
    fs::create_dir_all(&dir).unwrap();
    let notes = dir.join("notes.json");
    let markers = dir.join("markers.json");
    fs::write(
        &notes,
        r#"[{"id":0,"start_seconds":0.5,"end_seconds":1.0,
             "octave":4,"note_name":"C","pitch":60,"channel":0}]"#,
    )
    .unwrap();
    fs::write(&markers, r#"[{"id":0,"tick":0,"time_seconds":0.0}]"#).unwrap();

    let storage = FsStorage::new(dir.clone());
    assert_eq!(
        storage.load_note_table(&notes).unwrap(),
        vec![NoteRow {
            id: 0,
            start_seconds: 0.5,
            end_seconds: 1.0,
            octave: 4,
            note_name: "C".into(),
            pitch: 60,
            channel: 0,
        }]
    );
    assert_eq!(
        storage.load_marker_table(&markers).unwrap(),
        vec![MarkerRow {
            id: 0,
            tick: 0,
            time_seconds: 0.0,
        }]
    );

    let err = storage.load_lyric_table(&dir.join("nope.json")).unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    let _ = fs::remove_dir_all(dir);
}
