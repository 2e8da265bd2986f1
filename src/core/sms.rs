use crate::domain::model::SmsMessage;
use chrono::NaiveDateTime;

/// Highest index still deleted one by one; above it the whole mailbox is purged.
pub const MAILBOX_PURGE_THRESHOLD: u32 = 24;

const HEADER_MARKER: &str = "+CMGR:";
/// Header position in a raw read when the `+CMGR:` line cannot be located
/// (echo of `AT+CMGF=1`, its `OK`, echo of `AT+CMGR=<i>`, blank lines).
const FALLBACK_HEADER_OFFSET: usize = 5;
const TIMESTAMP_FORMAT: &str = "%y/%m/%d,%H:%M:%S";

/// Split a raw `AT+CMGR` response into header fields and body.
///
/// `+CMGR: "REC UNREAD","+48503815525","","24/10/19,12:00:00+08"` is the header;
/// every following line up to the final `OK` is the body.
pub fn parse_sms(index: u32, raw: &str) -> SmsMessage {
    let lines: Vec<&str> = raw.lines().collect();
    let header_at = lines
        .iter()
        .position(|line| line.contains(HEADER_MARKER))
        .unwrap_or(FALLBACK_HEADER_OFFSET);

    let header = lines.get(header_at).copied().unwrap_or_default();
    let fields: Vec<&str> = header.split('"').collect();
    let field = |position: usize| {
        fields
            .get(position)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    };

    let mut body_lines: Vec<&str> = lines.iter().skip(header_at + 1).copied().collect();
    while let Some(last) = body_lines.last() {
        let last = last.trim();
        if last.is_empty() || last == "OK" {
            body_lines.pop();
        } else {
            break;
        }
    }

    SmsMessage {
        index,
        status: field(1).map(str::to_string),
        sender: field(3).map(str::to_string),
        timestamp: field(7).and_then(parse_timestamp),
        body: body_lines.join("\n").trim().to_string(),
    }
}

/// Mailbox-full guard: purge everything once the index passes the threshold.
pub fn should_purge_mailbox(index: u32) -> bool {
    index > MAILBOX_PURGE_THRESHOLD
}

// "24/10/19,12:00:00+08" 時區以 15 分鐘為單位, 這裡只取本地時間
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let local = value.get(..17)?;
    NaiveDateTime::parse_from_str(local, TIMESTAMP_FORMAT).ok()
}
