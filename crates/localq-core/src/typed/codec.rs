//! PayloadCodec - payload ファイルと Task の相互変換
//!
//! On disk a payload is compact JSON, written once by `send` and read back
//! verbatim by every execution attempt.

use super::task::Task;

pub type CodecError = serde_json::Error;

pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: Task>(task: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(task)
    }

    pub fn decode<T: Task>(bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes)
    }
}
