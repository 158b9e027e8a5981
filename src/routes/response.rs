use serde::Serialize;

use crate::recording::RecordingView;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Health {
        ok: bool,
    },
    Upload {
        message: &'a str,
        recording: RecordingView,
    },
    Deleted {
        message: &'a str,
    },
}
