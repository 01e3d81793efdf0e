/// Directive compiler
///
/// Turns a user-supplied edit directive ("Keep: 00:10-00:45. Order: 2,1.
/// Output: webm. Quality: high") into a validated, immutable `EditPlan`
/// consumed by the execution engine. Parsing is pure and synchronous:
/// no I/O, no shared state, fail-fast on the first violation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum directive length in characters
pub const MAX_DIRECTIVE_CHARS: usize = 1000;

/// Validation failures produced by the directive compiler.
///
/// Surfaced to the caller verbatim; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("directive exceeds {MAX_DIRECTIVE_CHARS} characters")]
    PromptTooLong,

    #[error("directive must contain exactly one Keep statement with at least one time range")]
    MissingKeepDirective,

    #[error("directive contains more than one Keep statement")]
    DuplicateKeepDirective,

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("unsupported output format: {0} (supported: mp4, webm, mkv)")]
    UnsupportedOutputFormat(String),

    #[error("invalid quality: {0} (supported: low, medium, high)")]
    InvalidQuality(String),
}

/// Container format of the rendered output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Webm,
    Mkv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
        }
    }

    fn parse(raw: &str) -> Result<Self, DirectiveError> {
        match raw.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "mkv" => Ok(Self::Mkv),
            _ => Err(DirectiveError::UnsupportedOutputFormat(raw.to_string())),
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp4
    }
}

/// Rendering quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn parse(raw: &str) -> Result<Self, DirectiveError> {
        match raw.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(DirectiveError::InvalidQuality(raw.to_string())),
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::Medium
    }
}

/// One Keep range, in seconds from the start of the source video.
///
/// Invariant: `start_seconds < end_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_seconds: u32,
    pub end_seconds: u32,
}

/// Validated, executable edit plan. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    /// Keep ranges in the order they were written
    pub segments: Vec<Segment>,
    /// Playback order as 1-based indices into `segments`; always a
    /// permutation of `1..=segments.len()`
    pub order: Vec<u32>,
    pub output_format: OutputFormat,
    pub quality: Quality,
}

impl EditPlan {
    /// Segments in playback order
    pub fn playback_segments(&self) -> Vec<Segment> {
        self.order
            .iter()
            .map(|&i| self.segments[(i - 1) as usize])
            .collect()
    }
}

/// Compile a directive into an `EditPlan`.
///
/// Grammar: `Keyword: value` statements separated by periods, values
/// comma-separated within a statement. Keywords are case-insensitive;
/// unrecognized statements are ignored. `Keep` is required exactly once,
/// `Order` defaults to the identity permutation, `Output` to mp4 and
/// `Quality` to medium. Violations are reported fail-fast in the order
/// Keep, Order, Output, Quality.
pub fn parse(text: &str) -> Result<EditPlan, DirectiveError> {
    if text.chars().count() > MAX_DIRECTIVE_CHARS {
        return Err(DirectiveError::PromptTooLong);
    }

    let mut keep_raw: Option<&str> = None;
    let mut order_raw: Option<&str> = None;
    let mut output_raw: Option<&str> = None;
    let mut quality_raw: Option<&str> = None;

    for statement in text.split('.') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let Some((keyword, value)) = statement.split_once(':') else {
            continue;
        };
        match keyword.trim().to_ascii_lowercase().as_str() {
            "keep" => {
                if keep_raw.is_some() {
                    return Err(DirectiveError::DuplicateKeepDirective);
                }
                keep_raw = Some(value);
            }
            "order" => order_raw = Some(value),
            "output" => output_raw = Some(value),
            "quality" => quality_raw = Some(value),
            _ => {}
        }
    }

    let segments = parse_segments(keep_raw.ok_or(DirectiveError::MissingKeepDirective)?)?;
    if segments.is_empty() {
        return Err(DirectiveError::MissingKeepDirective);
    }

    let order = match order_raw {
        Some(raw) => parse_order(raw, segments.len())?,
        None => (1..=segments.len() as u32).collect(),
    };

    let output_format = match output_raw {
        Some(raw) => OutputFormat::parse(raw.trim())?,
        None => OutputFormat::default(),
    };

    let quality = match quality_raw {
        Some(raw) => Quality::parse(raw.trim())?,
        None => Quality::default(),
    };

    Ok(EditPlan {
        segments,
        order,
        output_format,
        quality,
    })
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, DirectiveError> {
    let mut segments = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (start_raw, end_raw) = part
            .split_once('-')
            .ok_or_else(|| DirectiveError::InvalidTimeRange(part.to_string()))?;
        let start_seconds = parse_timestamp(start_raw.trim())
            .ok_or_else(|| DirectiveError::InvalidTimeRange(part.to_string()))?;
        let end_seconds = parse_timestamp(end_raw.trim())
            .ok_or_else(|| DirectiveError::InvalidTimeRange(part.to_string()))?;
        if end_seconds <= start_seconds {
            return Err(DirectiveError::InvalidTimeRange(part.to_string()));
        }
        segments.push(Segment {
            start_seconds,
            end_seconds,
        });
    }
    Ok(segments)
}

/// Parse `mm:ss` or `hh:mm:ss` into whole seconds
fn parse_timestamp(raw: &str) -> Option<u32> {
    let fields: Vec<&str> = raw.split(':').collect();
    if fields.len() != 2 && fields.len() != 3 {
        return None;
    }
    let mut total: u32 = 0;
    for field in &fields {
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let value: u32 = field.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    Some(total)
}

fn parse_order(raw: &str, segment_count: usize) -> Result<Vec<u32>, DirectiveError> {
    let mut order = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(DirectiveError::InvalidOrder(part.to_string()));
        }
        let index: u32 = part
            .parse()
            .map_err(|_| DirectiveError::InvalidOrder(part.to_string()))?;
        if index == 0 || index as usize > segment_count {
            return Err(DirectiveError::InvalidOrder(format!(
                "index {} out of range 1..={}",
                index, segment_count
            )));
        }
        order.push(index);
    }

    // Must be a bijection over 1..=N
    if order.len() != segment_count {
        return Err(DirectiveError::InvalidOrder(format!(
            "expected {} indices, got {}",
            segment_count,
            order.len()
        )));
    }
    let mut seen = vec![false; segment_count];
    for &index in &order {
        let slot = &mut seen[(index - 1) as usize];
        if *slot {
            return Err(DirectiveError::InvalidOrder(format!(
                "duplicate index {}",
                index
            )));
        }
        *slot = true;
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_directive_uses_defaults() {
        let plan = parse("Keep: 00:00-00:30").unwrap();
        assert_eq!(
            plan.segments,
            vec![Segment {
                start_seconds: 0,
                end_seconds: 30
            }]
        );
        assert_eq!(plan.order, vec![1]);
        assert_eq!(plan.output_format, OutputFormat::Mp4);
        assert_eq!(plan.quality, Quality::Medium);
    }

    #[test]
    fn full_directive() {
        let plan =
            parse("Keep: 00:00-00:30, 01:00-01:45. Order: 2,1. Output: webm. Quality: high")
                .unwrap();
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.segments[1].start_seconds, 60);
        assert_eq!(plan.segments[1].end_seconds, 105);
        assert_eq!(plan.order, vec![2, 1]);
        assert_eq!(plan.output_format, OutputFormat::Webm);
        assert_eq!(plan.quality, Quality::High);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let plan = parse("KEEP: 00:00-00:10. OUTPUT: MKV. quality: LOW").unwrap();
        assert_eq!(plan.output_format, OutputFormat::Mkv);
        assert_eq!(plan.quality, Quality::Low);
    }

    #[test]
    fn hh_mm_ss_timestamps() {
        let plan = parse("Keep: 01:02:03-01:02:04").unwrap();
        assert_eq!(plan.segments[0].start_seconds, 3723);
        assert_eq!(plan.segments[0].end_seconds, 3724);
    }

    #[test]
    fn reorder_property_holds() {
        let plan = parse("Keep: 00:00-00:10, 00:20-00:30, 00:40-00:50. Order: 3,1,2").unwrap();
        let playback = plan.playback_segments();
        assert_eq!(playback[0], plan.segments[2]);
        assert_eq!(playback[1], plan.segments[0]);
        assert_eq!(playback[2], plan.segments[1]);
    }

    #[test]
    fn too_long_directive_rejected_first() {
        // Even a structurally broken directive reports PromptTooLong first
        let text = "x".repeat(MAX_DIRECTIVE_CHARS + 1);
        assert_eq!(parse(&text), Err(DirectiveError::PromptTooLong));
    }

    #[test]
    fn exactly_max_length_is_accepted() {
        let mut text = String::from("Keep: 00:00-00:30");
        text.push_str(&" ".repeat(MAX_DIRECTIVE_CHARS - text.len()));
        assert_eq!(text.chars().count(), MAX_DIRECTIVE_CHARS);
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn missing_keep_rejected() {
        assert_eq!(
            parse("Output: mp4"),
            Err(DirectiveError::MissingKeepDirective)
        );
        assert_eq!(parse("Keep: "), Err(DirectiveError::MissingKeepDirective));
    }

    #[test]
    fn duplicate_keep_rejected() {
        assert_eq!(
            parse("Keep: 00:00-00:10. Keep: 00:20-00:30"),
            Err(DirectiveError::DuplicateKeepDirective)
        );
    }

    #[test]
    fn empty_range_rejected() {
        assert!(matches!(
            parse("Keep: 00:30-00:30"),
            Err(DirectiveError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            parse("Keep: 00:45-00:30"),
            Err(DirectiveError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn malformed_timestamps_rejected() {
        for bad in [
            "Keep: 00:00",
            "Keep: abc-def",
            "Keep: 1-2",
            "Keep: 00:00-00:0x",
        ] {
            assert!(
                matches!(parse(bad), Err(DirectiveError::InvalidTimeRange(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn order_out_of_range_rejected() {
        assert!(matches!(
            parse("Keep: 00:00-00:10, 00:20-00:30. Order: 0,1"),
            Err(DirectiveError::InvalidOrder(_))
        ));
        assert!(matches!(
            parse("Keep: 00:00-00:10, 00:20-00:30. Order: 1,3"),
            Err(DirectiveError::InvalidOrder(_))
        ));
    }

    #[test]
    fn order_duplicates_and_omissions_rejected() {
        assert!(matches!(
            parse("Keep: 00:00-00:10, 00:20-00:30. Order: 1,1"),
            Err(DirectiveError::InvalidOrder(_))
        ));
        assert!(matches!(
            parse("Keep: 00:00-00:10, 00:20-00:30. Order: 1"),
            Err(DirectiveError::InvalidOrder(_))
        ));
        assert!(matches!(
            parse("Keep: 00:00-00:10. Order: x"),
            Err(DirectiveError::InvalidOrder(_))
        ));
    }

    #[test]
    fn unsupported_output_rejected() {
        assert_eq!(
            parse("Keep: 00:00-00:30. Output: avi"),
            Err(DirectiveError::UnsupportedOutputFormat("avi".to_string()))
        );
    }

    #[test]
    fn invalid_quality_rejected() {
        assert_eq!(
            parse("Keep: 00:00-00:30. Quality: ultra"),
            Err(DirectiveError::InvalidQuality("ultra".to_string()))
        );
    }

    #[test]
    fn keep_errors_win_over_later_stages() {
        // Fail-fast ordering: the broken Keep range is reported even though
        // Output is also invalid
        assert!(matches!(
            parse("Keep: 00:30-00:10. Output: avi"),
            Err(DirectiveError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn unknown_statements_ignored() {
        let plan = parse("Speed: 2x. Keep: 00:00-00:30. Loop forever").unwrap();
        assert_eq!(plan.segments.len(), 1);
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = parse("Keep: 00:00-00:30, 01:00-01:45. Order: 2,1. Quality: high").unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["output_format"], "mp4");
        let back: EditPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }
}
