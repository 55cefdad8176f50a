//! iCalendar export of the next review reminder.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use speedread_core::scheduler;
use speedread_core::{Level, Stage};

const EVENT_LENGTH_MINUTES: i64 = 15;
const ALARM_TRIGGER: &str = "-PT5M";
const PRODID: &str = "-//SmartSpeedReading//EN";
const UID_DOMAIN: &str = "smartspeedreading.app";
const MAX_LINE_OCTETS: usize = 75;

/// A single review event for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarReminder {
    pub level: Level,
    pub stage: Stage,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub uid: String,
}

impl CalendarReminder {
    /// Reminder for the review that follows `stage`, scheduled from `now`.
    #[must_use]
    pub fn new(level: Level, stage: Stage, now: DateTime<Utc>) -> Self {
        let starts_at = scheduler::next_review_date(stage, now);
        Self {
            level,
            stage,
            label: scheduler::next_review_interval_label(stage),
            created_at: now,
            starts_at,
            ends_at: starts_at + Duration::minutes(EVENT_LENGTH_MINUTES),
            uid: format!("{}@{UID_DOMAIN}", Uuid::new_v4()),
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("溫習速讀: 等級 {} ({}後)", self.level, self.label)
    }

    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "根據遺忘曲線，現在是時候溫習等級 {} 的生字了！保持記憶清晰！\n目標: {}後複習。",
            self.level, self.label
        )
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("review_reminder_{}_{}.ics", self.level, self.label)
    }

    /// Render the reminder as an iCalendar document with CRLF line endings.
    #[must_use]
    pub fn to_ics(&self) -> String {
        let lines = [
            "BEGIN:VCALENDAR".to_owned(),
            "VERSION:2.0".to_owned(),
            format!("PRODID:{PRODID}"),
            "BEGIN:VEVENT".to_owned(),
            format!("UID:{}", self.uid),
            format!("DTSTAMP:{}", format_utc(self.created_at)),
            format!("DTSTART:{}", format_utc(self.starts_at)),
            format!("DTEND:{}", format_utc(self.ends_at)),
            format!("SUMMARY:{}", escape_text(&self.title())),
            format!("DESCRIPTION:{}", escape_text(&self.description())),
            "BEGIN:VALARM".to_owned(),
            format!("TRIGGER:{ALARM_TRIGGER}"),
            "ACTION:DISPLAY".to_owned(),
            "DESCRIPTION:Reminder".to_owned(),
            "END:VALARM".to_owned(),
            "END:VEVENT".to_owned(),
            "END:VCALENDAR".to_owned(),
        ];

        let mut out = String::new();
        for line in &lines {
            out.push_str(&fold_line(line));
            out.push_str("\r\n");
        }
        out
    }
}

fn format_utc(value: DateTime<Utc>) -> String {
    value.format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Split a content line into chunks of at most 75 octets, never inside a
/// UTF-8 sequence. Continuation lines start with a single space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_owned();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for ch in line.chars() {
        let width = ch.len_utf8();
        if used + width > budget {
            out.push_str("\r\n ");
            used = 0;
            // The leading space counts against the continuation line.
            budget = MAX_LINE_OCTETS - 1;
        }
        out.push(ch);
        used += width;
    }
    out
}
