use chrono::NaiveTime;

/// Split "H:M" into numeric parts. Returns None when either side is not a number.
fn split_hm(time: &str) -> Option<(u32, u32)> {
    let (h, m) = time.split_once(':')?;
    let hours = h.trim().parse::<u32>().ok()?;
    let minutes = m.trim().parse::<u32>().ok()?;
    Some((hours, minutes))
}

/// 24-hour "HH:MM" to 12-hour "hh:mm AM/PM".
///
/// Hour 0 shows as 12 AM and hour 12 as 12 PM. Input that does not split into
/// numeric hour/minute parts is returned unchanged.
pub fn format_time_for_display(time: &str) -> String {
    if time.is_empty() {
        return String::new();
    }
    let Some((hours, minutes)) = split_hm(time) else {
        return time.to_string();
    };
    let period = if hours >= 12 { "PM" } else { "AM" };
    let display_hours = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{:02}:{:02} {}", display_hours, minutes, period)
}

/// Re-render "H:M" as zero-padded "HH:MM".
pub fn format_time_simple(time: &str) -> String {
    if time.is_empty() {
        return String::new();
    }
    match split_hm(time) {
        Some((hours, minutes)) => format!("{:02}:{:02}", hours, minutes),
        None => time.to_string(),
    }
}

pub fn format_duration(start: &str, end: &str) -> String {
    if start.is_empty() || end.is_empty() {
        return String::new();
    }
    format!("{} - {}", format_time_simple(start), format_time_simple(end))
}

/// Hour 0-23 (one or two digits), a colon, then exactly two minute digits 00-59.
pub fn validate_time_format(time: &str) -> bool {
    let Some((h, m)) = time.split_once(':') else {
        return false;
    };
    let hb = h.as_bytes();
    let mb = m.as_bytes();
    if hb.is_empty() || hb.len() > 2 || !hb.iter().all(u8::is_ascii_digit) {
        return false;
    }
    if mb.len() != 2 || !mb.iter().all(u8::is_ascii_digit) {
        return false;
    }
    // Two-digit hours: 00-19 or 20-23.
    if hb.len() == 2 && !(hb[0] <= b'1' || (hb[0] == b'2' && hb[1] <= b'3')) {
        return false;
    }
    mb[0] <= b'5'
}

fn parse_clock(time: &str) -> Option<NaiveTime> {
    let (hours, minutes) = split_hm(time)?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Strictly-later comparison on a common day. A range crossing midnight is
/// never treated as ending the next day.
pub fn is_end_time_after_start_time(start: &str, end: &str) -> bool {
    if start.is_empty() || end.is_empty() {
        return false;
    }
    match (parse_clock(start), parse_clock(end)) {
        (Some(s), Some(e)) => e > s,
        _ => false,
    }
}
