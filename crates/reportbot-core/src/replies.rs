//! Typed handler outcomes and their user-facing rendering.

use std::time::Duration;

use crate::{
    commands::ReportKind,
    config::Locale,
    messaging::types::OutboundMessage,
};

/// What a handler produced for one inbound message.
///
/// The dispatcher turns every outcome into at most one outbound send; only
/// `Dropped` renders to nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(OutboundMessage),
    NotFound { file_name: String },
    Usage(ReportKind),
    Help,
    CoolingDown { retry_in: Duration },
    RateLimited,
    Failed,
    Dropped,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Reply(_) => "reply",
            Outcome::NotFound { .. } => "not_found",
            Outcome::Usage(_) => "usage",
            Outcome::Help => "help",
            Outcome::CoolingDown { .. } => "cooling_down",
            Outcome::RateLimited => "rate_limited",
            Outcome::Failed => "failed",
            Outcome::Dropped => "dropped",
        }
    }
}

/// Localized notice texts.
#[derive(Clone, Copy, Debug)]
pub struct ReplyTexts {
    locale: Locale,
}

impl ReplyTexts {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn render(&self, outcome: Outcome) -> Option<OutboundMessage> {
        let text = match outcome {
            Outcome::Reply(msg) => return Some(msg),
            Outcome::Dropped => return None,
            Outcome::NotFound { file_name } => self.not_found(&file_name),
            Outcome::Usage(kind) => self.usage(kind).to_string(),
            Outcome::Help => self.help().to_string(),
            Outcome::CoolingDown { retry_in } => self.cooling_down(retry_in),
            Outcome::RateLimited => self.rate_limited().to_string(),
            Outcome::Failed => self.failed().to_string(),
        };
        Some(OutboundMessage::Text(text))
    }

    fn not_found(&self, file_name: &str) -> String {
        match self.locale {
            Locale::En => format!("❌ {file_name} was not found."),
            Locale::Ur => format!("❌ {file_name} موجود نہیں ہے۔"),
        }
    }

    fn usage(&self, kind: ReportKind) -> &'static str {
        match (self.locale, kind) {
            (Locale::En, ReportKind::Daily) => "📄 Usage:\nreport 23122025",
            (Locale::Ur, ReportKind::Daily) => "📄 استعمال کریں:\nreport 23122025",
            (Locale::En, ReportKind::Monthly) => "📊 Usage:\nmonthly report october 2025",
            (Locale::Ur, ReportKind::Monthly) => "📊 استعمال کریں:\nmonthly report october 2025",
        }
    }

    fn help(&self) -> &'static str {
        match self.locale {
            Locale::En => {
                "👋 Send a question, or ask for a report:\nreport 23122025\nmonthly report october 2025"
            }
            Locale::Ur => {
                "👋 سوال بھیجیں، یا رپورٹ کے لیے لکھیں:\nreport 23122025\nmonthly report october 2025"
            }
        }
    }

    fn cooling_down(&self, retry_in: Duration) -> String {
        let secs = retry_in.as_secs_f64().ceil().max(1.0) as u64;
        match self.locale {
            Locale::En => format!("⏳ Please wait {secs}s before asking again."),
            Locale::Ur => format!("⏳ براہ کرم دوبارہ پوچھنے سے پہلے {secs} سیکنڈ انتظار کریں۔"),
        }
    }

    fn rate_limited(&self) -> &'static str {
        match self.locale {
            Locale::En => "⚠️ The AI service is busy right now. Please try again in a minute.",
            Locale::Ur => "⚠️ AI سروس اس وقت مصروف ہے، ایک منٹ بعد دوبارہ کوشش کریں۔",
        }
    }

    fn failed(&self) -> &'static str {
        match self.locale {
            Locale::En => "⚠️ Something went wrong. Please try again.",
            Locale::Ur => "⚠️ کچھ غلط ہو گیا، دوبارہ کوشش کریں۔",
        }
    }
}
