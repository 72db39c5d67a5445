use benchview_model::{Outcome, RequestEvent, SchemaKind};

use crate::error::ReplayError;

/// Column holding the epoch-ms timestamp in a rich trace row.
const RICH_TIMESTAMP_COLUMN: usize = 0;
/// Column holding the status code in a rich trace row.
const RICH_STATUS_COLUMN: usize = 3;
/// Column holding the per-request latency in milliseconds in a rich trace row.
const RICH_LATENCY_COLUMN: usize = 14;
/// A rich row is accepted only if it has at least this many columns.
const RICH_MIN_COLUMNS: usize = 4;

/// Convert a raw tabular trace into an ordered sequence of normalized request events.
///
/// Never fails: unparsable rows are skipped, because partial data beats no data. Empty or
/// header-only input yields an empty sequence.
///
/// `success_status` is the status column value classified as [Outcome::Ok]; everything else
/// is a failure.
pub fn parse(raw: &str, schema: SchemaKind, success_status: &str) -> Vec<RequestEvent> {
    match schema {
        SchemaKind::Rich => parse_rich(raw, success_status),
        SchemaKind::Minimal => parse_minimal(raw, success_status),
    }
}

/// Rich traces record absolute epoch-ms timestamps; the first parsed row establishes the time
/// origin. At most one leading unparsable row is tolerated as the header. If the row after the
/// header also fails to parse then the whole file yields an empty sequence, a documented
/// limitation of the origin rule.
fn parse_rich(raw: &str, success_status: &str) -> Vec<RequestEvent> {
    let mut events = Vec::new();
    let mut origin_ms: Option<f64> = None;
    let mut header_skipped = false;

    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split(',').collect();
        if columns.len() < RICH_MIN_COLUMNS {
            skip_row(index, "fewer than 4 columns");
            continue;
        }

        let timestamp_ms: f64 = match columns[RICH_TIMESTAMP_COLUMN].trim().parse() {
            Ok(ts) => ts,
            Err(_) => {
                if origin_ms.is_none() {
                    if header_skipped {
                        // The first non-header row failed to parse, so there is no time
                        // origin to normalize against. Give up on this file.
                        skip_row(index, "no time origin could be established");
                        return Vec::new();
                    }
                    header_skipped = true;
                    continue;
                }
                skip_row(index, "timestamp does not parse");
                continue;
            }
        };

        let origin_ms = *origin_ms.get_or_insert(timestamp_ms);
        let status = columns[RICH_STATUS_COLUMN].trim();
        let latency_ms: f64 = columns
            .get(RICH_LATENCY_COLUMN)
            .and_then(|column| column.trim().parse().ok())
            .unwrap_or(0.0);

        events.push(RequestEvent {
            offset_secs: (timestamp_ms - origin_ms) / 1000.0,
            outcome: outcome_for(status, success_status),
            latency_secs: latency_ms / 1000.0,
        });
    }

    events
}

/// Minimal traces carry a pre-normalized offset in column 0, used directly, and a status
/// string in column 1. There is no per-event latency; the caller injects the system average
/// afterwards with [apply_average_latency].
fn parse_minimal(raw: &str, success_status: &str) -> Vec<RequestEvent> {
    let mut events = Vec::new();

    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut columns = line.split(',');
        let offset_secs: f64 = match columns.next().map(str::trim).unwrap_or("").parse() {
            Ok(offset) => offset,
            Err(_) => {
                skip_row(index, "offset does not parse");
                continue;
            }
        };
        let status = columns.next().map(str::trim).unwrap_or("");

        events.push(RequestEvent {
            offset_secs,
            outcome: outcome_for(status, success_status),
            latency_secs: 0.0,
        });
    }

    events
}

/// Fill the per-event latency of a minimal trace with the system's average response time.
///
/// This is an approximation borrowed from the summary metrics, not raw data; loaded sources
/// carry [benchview_model::LatencySource::ApproximatedFromAverage] to say so.
pub fn apply_average_latency(events: &mut [RequestEvent], avg_response_secs: f64) {
    for event in events {
        event.latency_secs = avg_response_secs;
    }
}

fn outcome_for(status: &str, success_status: &str) -> Outcome {
    if status == success_status {
        Outcome::Ok
    } else {
        Outcome::Fail
    }
}

fn skip_row(index: usize, reason: &str) {
    let error = ReplayError::Parse {
        line: index + 1,
        reason: reason.to_string(),
    };
    log::debug!("Skipping row: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SUCCESS: &str = "201";

    /// Build a rich row with the timestamp, status and latency in the right columns.
    fn rich_row(timestamp_ms: u64, status: &str, latency_ms: u64) -> String {
        let mut columns = vec![timestamp_ms.to_string()];
        columns.extend((0..14).map(|_| "x".to_string()));
        columns[3] = status.to_string();
        columns[14] = latency_ms.to_string();
        columns.join(",")
    }

    #[test]
    fn rich_rows_normalize_against_the_first_timestamp() {
        let raw = format!("{}\n{}", rich_row(1000, "201", 50), rich_row(1500, "500", 30));
        let events = parse(&raw, SchemaKind::Rich, SUCCESS);

        assert_eq!(
            events,
            vec![
                RequestEvent {
                    offset_secs: 0.0,
                    outcome: Outcome::Ok,
                    latency_secs: 0.05,
                },
                RequestEvent {
                    offset_secs: 0.5,
                    outcome: Outcome::Fail,
                    latency_secs: 0.03,
                },
            ]
        );
    }

    #[test]
    fn rich_header_row_is_skipped() {
        let header = "timeStamp,elapsed,label,responseCode,a,b,c,d,e,f,g,h,i,j,Latency";
        let raw = format!("{header}\n{}", rich_row(1000, "201", 50));
        let events = parse(&raw, SchemaKind::Rich, SUCCESS);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].offset_secs, 0.0);
    }

    #[test]
    fn rich_gives_up_when_no_origin_can_be_established() {
        let raw = "timeStamp,elapsed,label,responseCode\nnot-a-number,x,y,201\n1000,x,y,201";
        assert_eq!(parse(raw, SchemaKind::Rich, SUCCESS), vec![]);
    }

    #[test]
    fn rich_short_rows_are_skipped_without_consuming_the_header_allowance() {
        let raw = format!("only,three,columns\n{}", rich_row(2000, "201", 10));
        let events = parse(&raw, SchemaKind::Rich, SUCCESS);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn rich_missing_latency_column_parses_to_zero() {
        let raw = "1000,x,y,201";
        let events = parse(raw, SchemaKind::Rich, SUCCESS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].latency_secs, 0.0);
    }

    #[test]
    fn rich_unparsable_row_after_origin_is_skipped_not_fatal() {
        let raw = format!(
            "{}\nbroken,x,y,201\n{}",
            rich_row(1000, "201", 50),
            rich_row(2000, "201", 60)
        );
        let events = parse(&raw, SchemaKind::Rich, SUCCESS);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].offset_secs, 1.0);
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert_eq!(parse("", SchemaKind::Rich, SUCCESS), vec![]);
        assert_eq!(parse("\n\n", SchemaKind::Rich, SUCCESS), vec![]);
        assert_eq!(parse("", SchemaKind::Minimal, SUCCESS), vec![]);
    }

    #[test]
    fn minimal_offsets_are_used_directly_and_latency_is_injected() {
        let raw = "0,201\n1,500";
        let mut events = parse(raw, SchemaKind::Minimal, SUCCESS);
        apply_average_latency(&mut events, 0.2);

        assert_eq!(
            events,
            vec![
                RequestEvent {
                    offset_secs: 0.0,
                    outcome: Outcome::Ok,
                    latency_secs: 0.2,
                },
                RequestEvent {
                    offset_secs: 1.0,
                    outcome: Outcome::Fail,
                    latency_secs: 0.2,
                },
            ]
        );
    }

    #[test]
    fn minimal_row_without_status_is_a_failure() {
        let events = parse("2.5", SchemaKind::Minimal, SUCCESS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].offset_secs, 2.5);
        assert_eq!(events[0].outcome, Outcome::Fail);
    }

    #[test]
    fn minimal_unparsable_offset_is_skipped() {
        let events = parse("offset,status\n0,201", SchemaKind::Minimal, SUCCESS);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn success_status_is_configurable() {
        let events = parse("0,200\n1,201", SchemaKind::Minimal, "200");
        assert_eq!(events[0].outcome, Outcome::Ok);
        assert_eq!(events[1].outcome, Outcome::Fail);
    }

    #[test]
    fn sorted_rich_timestamps_produce_non_decreasing_offsets() {
        let raw = (0..20)
            .map(|i| rich_row(5000 + i * 137, "201", 10))
            .collect::<Vec<_>>()
            .join("\n");
        let events = parse(&raw, SchemaKind::Rich, SUCCESS);
        assert_eq!(events.len(), 20);
        for pair in events.windows(2) {
            assert!(pair[0].offset_secs <= pair[1].offset_secs);
        }
    }
}
