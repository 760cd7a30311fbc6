//! Error type shared by the loader, cache, remote lookups and the tool surface.
//!
//! The `Display` text of each variant is what the calling agent sees, so the
//! messages stay in the same language as the data set.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("데이터 파일이 존재하지 않습니다: {path}\n산불 데이터 JSON 파일을 먼저 준비해주세요.")]
    DataMissing { path: String },

    #[error("데이터 로드 중 오류 발생 ({path}): {reason}")]
    DataUnreadable { path: String, reason: String },

    #[error("캐시 파일 로드 중 오류 발생 ({path}): {reason}")]
    CacheUnreadable { path: String, reason: String },

    #[error("캐시 파일 저장 중 오류 발생 ({path}): {reason}")]
    CacheWrite { path: String, reason: String },

    #[error("데이터 파일 저장 중 오류 발생 ({path}): {reason}")]
    StoreWrite { path: String, reason: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("remote lookup failed: {0}")]
    RemoteLookup(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
