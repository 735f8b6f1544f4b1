use crate::models::entities::enum_types::SessionType;
use eyre::{eyre, Report};
use std::env;

pub const DEFAULT_CALL_RATE: i32 = 70;
pub const DEFAULT_CHAT_RATE: i32 = 65;
pub const DEFAULT_VIDEO_RATE: i32 = 75;

/// Platform-wide astrologer share, in percent, per session type.
#[derive(Debug, Clone)]
pub struct CommissionInfo {
    pub call_rate: i32,
    pub chat_rate: i32,
    pub video_rate: i32,
}

impl Default for CommissionInfo {
    fn default() -> Self {
        Self {
            call_rate: DEFAULT_CALL_RATE,
            chat_rate: DEFAULT_CHAT_RATE,
            video_rate: DEFAULT_VIDEO_RATE,
        }
    }
}

impl CommissionInfo {
    pub fn new() -> Result<Self, Report> {
        Ok(Self {
            call_rate: rate_from_env("COMMISSION_CALL_RATE", DEFAULT_CALL_RATE)?,
            chat_rate: rate_from_env("COMMISSION_CHAT_RATE", DEFAULT_CHAT_RATE)?,
            video_rate: rate_from_env("COMMISSION_VIDEO_RATE", DEFAULT_VIDEO_RATE)?,
        })
    }

    pub fn rate_for(&self, session_type: SessionType) -> i32 {
        match session_type {
            SessionType::Call => self.call_rate,
            SessionType::Chat => self.chat_rate,
            SessionType::Video => self.video_rate,
        }
    }
}

fn rate_from_env(key: &str, default: i32) -> Result<i32, Report> {
    let rate: i32 = match env::var(key) {
        Ok(raw) => raw.parse()?,
        Err(_) => default,
    };

    if !(0..=100).contains(&rate) {
        return Err(eyre!("{} must be between 0 and 100, got {}", key, rate));
    }

    Ok(rate)
}
