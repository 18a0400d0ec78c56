use mid2bar_domain_eval::ScoreSummary;
use mid2bar_ports::types::{Seconds, Volume100};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    Play,
    Pause,
    Resume,
    TogglePlay,
    Restart,
    SeekTo { seconds: Seconds },
    SeekRatio { ratio: f64 },
    SetVolume { volume: Volume100 },
    StepVolume { delta: i32 },
    ToggleAutoPlay,
    SetMicInput { enabled: bool },
    ToggleMicInput,
    SetMicChannel { channel: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    PageChanged {
        index: Option<usize>,
        start_time: Option<Seconds>,
        end_time: Option<Seconds>,
    },
    ScoresUpdated { summary: ScoreSummary },
    MicInputChanged { enabled: bool, error: Option<String> },
    AutoPlayChanged { enabled: bool },
    VolumeChanged { volume: Volume100 },
    PlaybackFinished { time: Seconds },
    FrameSkipped { reason: String },
}

pub fn parse_command(line: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(line)
}

pub fn encode_event(event: &Event) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
