use crate::domain::model::Notification;

pub const RING_MARKER: &str = "RING";
pub const CLIP_MARKER: &str = "+CLIP:";
pub const CMTI_MARKER: &str = "+CMTI:";

/// Turn one chunk of unsolicited modem text into a typed notification.
///
/// Calls win over messages when both markers are present. Missing or
/// garbled fields never abort classification; they degrade to `None`
/// sub-fields or to `Unknown`.
pub fn classify(text: &str) -> Notification {
    if text.contains(RING_MARKER) || text.contains(CLIP_MARKER) {
        return classify_call(text);
    }

    if text.contains(CMTI_MARKER) {
        if let Some(index) = sms_index(text) {
            return Notification::IncomingSms { index };
        }
        tracing::warn!("Malformed {} line: {:?}", CMTI_MARKER, text.trim());
    }

    Notification::Unknown {
        raw: text.to_string(),
    }
}

// +CLIP: "+48503815525",145,"",0,"Jan",0
fn classify_call(text: &str) -> Notification {
    let clip_line = text.lines().find(|line| line.contains(CLIP_MARKER));
    let fields: Vec<&str> = clip_line.map(|line| line.split('"').collect()).unwrap_or_default();

    Notification::IncomingCall {
        caller_number: non_empty_field(&fields, 1),
        caller_name: non_empty_field(&fields, 5),
    }
}

// +CMTI: "SM",7
fn sms_index(text: &str) -> Option<u32> {
    let line = text.lines().find(|line| line.contains(CMTI_MARKER))?;
    line.split(',').nth(1)?.trim().parse().ok()
}

fn non_empty_field(fields: &[&str], position: usize) -> Option<String> {
    fields
        .get(position)
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_line_yields_caller() {
        let chunk = "\r\nRING\r\n\r\n+CLIP: \"+48503815525\",145,\"\",0,\"\",0\r\n";
        assert_eq!(
            classify(chunk),
            Notification::IncomingCall {
                caller_number: Some("+48503815525".to_string()),
                caller_name: None,
            }
        );
    }

    #[test]
    fn test_clip_without_ring_is_still_a_call() {
        let notification = classify("+CLIP: \"+48503815525\",145,\"\",0,\"Jan\",0");
        assert_eq!(
            notification,
            Notification::IncomingCall {
                caller_number: Some("+48503815525".to_string()),
                caller_name: Some("Jan".to_string()),
            }
        );
    }

    #[test]
    fn test_ring_without_clip_has_unknown_caller() {
        assert_eq!(
            classify("\r\nRING\r\n"),
            Notification::IncomingCall {
                caller_number: None,
                caller_name: None,
            }
        );
        // 號碼被隱藏 (withheld)
        assert_eq!(
            classify("RING\r\n+CLIP: \"\",128,\"\",0,\"\",0\r\n"),
            Notification::IncomingCall {
                caller_number: None,
                caller_name: None,
            }
        );
    }

    #[test]
    fn test_cmti_yields_sms_index() {
        assert_eq!(
            classify("\r\n+CMTI: \"SM\",7\r\n"),
            Notification::IncomingSms { index: 7 }
        );
    }

    #[test]
    fn test_garbled_cmti_fails_soft() {
        let raw = "+CMTI: \"SM\"\r\n";
        assert_eq!(
            classify(raw),
            Notification::Unknown {
                raw: raw.to_string()
            }
        );
        assert!(matches!(classify("+CMTI: \"SM\",x7"), Notification::Unknown { .. }));
    }

    #[test]
    fn test_unrelated_text_is_unknown() {
        assert_eq!(
            classify("+CPIN: READY\r\n"),
            Notification::Unknown {
                raw: "+CPIN: READY\r\n".to_string()
            }
        );
        assert!(matches!(classify(""), Notification::Unknown { .. }));
    }
}
