use crate::errors::TimecodeError;
use crate::subtitles::{
    active_entry, format_timecode, parse_caption_track, parse_timecode, serialize_caption_track,
    CaptionEntry, CaptionTrack, TimelineCursor,
};
use proptest::prelude::*;

#[cfg(test)]
mod test_helpers {
    use crate::subtitles::{CaptionEntry, CaptionTrack};

    pub const BILINGUAL_SRT: &str = "1\r\n00:00:01,000 --> 00:00:04,000\r\nHello\r\n哈囉\r\n\r\n2\r\n00:00:04,500 --> 00:00:06,250\r\nHow are you?\r\n你好嗎？\r\n";

    pub fn overlapping_track() -> CaptionTrack {
        CaptionTrack::new(vec![
            CaptionEntry::new("A", 0.0, 5.0, "first"),
            CaptionEntry::new("B", 2.0, 8.0, "second"),
        ])
    }
}

#[test]
fn test_parse_timecode_fields() {
    assert_eq!(parse_timecode("00:00:01,000"), Ok(1.0));
    assert_eq!(parse_timecode("01:02:03,456"), Ok(3723.456));
    assert_eq!(parse_timecode("  00:01:00,250 "), Ok(60.25));
    // No clamping on out-of-range fields
    assert_eq!(parse_timecode("00:00:75,000"), Ok(75.0));
    assert_eq!(parse_timecode("100:00:00,000"), Ok(360000.0));
    // Milliseconds are a number, not a fraction
    assert_eq!(parse_timecode("00:00:01,5"), Ok(1.005));
}

#[test]
fn test_parse_timecode_rejects_malformed() {
    for bad in [
        "",
        "00:00:01",
        "00:00:01.000",
        "00:01,000",
        "aa:00:01,000",
        "00:00:01,000,000",
        "-1:00:01,000",
    ] {
        assert!(
            matches!(parse_timecode(bad), Err(TimecodeError::Malformed(_))),
            "expected {:?} to be rejected",
            bad
        );
    }
}

#[test]
fn test_format_timecode() {
    assert_eq!(format_timecode(0.0), "00:00:00,000");
    assert_eq!(format_timecode(3723.456), "01:02:03,456");
    assert_eq!(format_timecode(90000.0), "25:00:00,000");
    assert_eq!(format_timecode(1.0006), "00:00:01,001");
    assert_eq!(format_timecode(-3.0), "00:00:00,000");
    assert_eq!(format_timecode(f64::NAN), "00:00:00,000");
}

proptest! {
    #[test]
    fn prop_timecode_round_trip(h in 0u64..100, m in 0u64..60, s in 0u64..60, ms in 0u64..1000) {
        let text = format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms);
        let seconds = parse_timecode(&text).unwrap();
        prop_assert_eq!(format_timecode(seconds), text);

        let expected = (h * 3_600_000 + m * 60_000 + s * 1000 + ms) as f64 / 1000.0;
        prop_assert!((seconds - expected).abs() < 0.0005);
    }

    #[test]
    fn prop_trailing_garbage_keeps_well_formed_entries(
        count in 1usize..12,
        garbage in prop::sample::select(vec![
            "junk",
            "7\nnot a timing line\ntext",
            "8\n00:00:01,000 --> 00:00:02,000",
            "9\n00:00:xx,000 --> 00:00:02,000\ntext",
        ]),
    ) {
        let mut text = String::new();
        for i in 0..count {
            text.push_str(&format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\nline {}\n\n",
                i + 1, i, i, i
            ));
        }
        text.push_str(garbage);

        let track = parse_caption_track(&text);
        prop_assert_eq!(track.len(), count);
        for (i, entry) in track.iter().enumerate() {
            prop_assert_eq!(&entry.id, &(i + 1).to_string());
            prop_assert_eq!(&entry.text, &format!("line {}", i));
        }
    }
}

#[test]
fn test_parse_bilingual_track() {
    use test_helpers::*;
    let track = parse_caption_track(BILINGUAL_SRT);
    assert_eq!(track.len(), 2);

    let first = &track.entries()[0];
    assert_eq!(first.id, "1");
    assert_eq!(first.start_time, 1.0);
    assert_eq!(first.end_time, 4.0);
    assert_eq!(first.text, "Hello\n哈囉");

    let second = &track.entries()[1];
    assert_eq!(second.start_time, 4.5);
    assert_eq!(second.end_time, 6.25);
    assert_eq!(second.text, "How are you?\n你好嗎？");
}

#[test]
fn test_parse_discards_short_and_untimed_blocks() {
    let text = "1\n00:00:01,000 --> 00:00:02,000\nkept\n\n\
                2\n00:00:03,000 --> 00:00:04,000\n\n\
                3\n00:00:05,000 -> 00:00:06,000\narrow too short\n\n\
                4\n00:00:05,000-->00:00:06,000\nno spaces\n\n\
                5\n00:00:07,000 --> 00:00:08,000\nalso kept";
    let track = parse_caption_track(text);
    let ids: Vec<&str> = track.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "5"]);
}

#[test]
fn test_parse_tolerates_messy_input() {
    let text = "\u{feff}\n\n1\n00:00:01,000 --> 00:00:02,000\nfirst  \n \n\n\n2\n00:00:03,000 --> 00:00:02,000 --> 00:00:09,000\nsecond\n\n\n";
    let track = parse_caption_track(text);
    assert_eq!(track.len(), 2);
    assert_eq!(track.entries()[0].text, "first");
    // Inverted timing is kept; extra separators are ignored
    assert_eq!(track.entries()[1].start_time, 3.0);
    assert_eq!(track.entries()[1].end_time, 2.0);
}

#[test]
fn test_parse_keeps_source_order() {
    let text = "b\n00:00:05,000 --> 00:00:06,000\nlater\n\na\n00:00:01,000 --> 00:00:02,000\nearlier";
    let track = parse_caption_track(text);
    assert_eq!(track.entries()[0].id, "b");
    assert_eq!(track.entries()[1].id, "a");
}

#[test]
fn test_parse_empty_input() {
    assert!(parse_caption_track("").is_empty());
    assert!(parse_caption_track(" \r\n\r\n ").is_empty());
}

#[test]
fn test_serialize_round_trip() {
    use test_helpers::*;
    let track = parse_caption_track(BILINGUAL_SRT);
    let text = serialize_caption_track(&track);
    assert!(text.starts_with("1\n00:00:01,000 --> 00:00:04,000\nHello\n哈囉\n\n2\n"));
    assert_eq!(parse_caption_track(&text), track);
}

#[test]
fn test_active_entry_overlap_prefers_first() {
    use test_helpers::*;
    let track = overlapping_track();
    assert_eq!(active_entry(&track, 3.0).map(|e| e.id.as_str()), Some("A"));
    assert_eq!(active_entry(&track, 6.0).map(|e| e.id.as_str()), Some("B"));
}

#[test]
fn test_active_entry_inclusive_bounds() {
    let track = CaptionTrack::new(vec![CaptionEntry::new("1", 1.0, 4.0, "x")]);
    assert!(active_entry(&track, 1.0).is_some());
    assert!(active_entry(&track, 4.0).is_some());
    assert!(active_entry(&track, 0.999).is_none());
    assert!(active_entry(&track, 4.001).is_none());
}

#[test]
fn test_active_entry_none_outside_intervals() {
    use test_helpers::*;
    let track = overlapping_track();
    assert!(active_entry(&track, 8.5).is_none());
    assert!(active_entry(&track, -1.0).is_none());
    assert!(active_entry(&CaptionTrack::default(), 0.0).is_none());
    // Inverted entries never match
    let inverted = CaptionTrack::new(vec![CaptionEntry::new("1", 4.0, 1.0, "x")]);
    assert!(active_entry(&inverted, 2.0).is_none());
}

#[test]
fn test_cursor_matches_linear_scan() {
    use test_helpers::*;
    let track = overlapping_track();
    let mut cursor = TimelineCursor::new();
    let mut t = 0.0;
    while t <= 9.0 {
        assert_eq!(
            cursor.active(&track, t).map(|e| e.id.clone()),
            active_entry(&track, t).map(|e| e.id.clone()),
            "mismatch at {}",
            t
        );
        t += 0.25;
    }
    cursor.reset();
    assert_eq!(cursor.active(&track, 3.0).map(|e| e.id.as_str()), Some("A"));
}

#[test]
fn test_cursor_skips_scan_inside_a_hit() {
    use test_helpers::*;
    let track = overlapping_track();
    let mut cursor = TimelineCursor::new();

    assert_eq!(cursor.active(&track, 1.0).map(|e| e.id.as_str()), Some("A"));
    assert!(cursor.is_warm_at(&track, 4.5));

    // B is remembered once A ends; A's end bounds where the hint is trusted
    assert_eq!(cursor.active(&track, 6.0).map(|e| e.id.as_str()), Some("B"));
    assert!(cursor.is_warm_at(&track, 7.5));
    assert!(!cursor.is_warm_at(&track, 4.0));
    assert!(!cursor.is_warm_at(&track, 8.5));
    assert_eq!(cursor.active(&track, 4.0).map(|e| e.id.as_str()), Some("A"));
}

#[test]
fn test_track_helpers() {
    use test_helpers::*;
    let track = overlapping_track();
    assert_eq!(track.duration_hint(), 8.0);
    assert_eq!(track.active_entry(7.0).map(|e| e.id.as_str()), Some("B"));
    assert_eq!((&track).into_iter().count(), 2);
    assert_eq!(CaptionTrack::default().duration_hint(), 0.0);
}
