//! End-of-round summary

use std::io::{self, Write};

use asr_loadgen_core::SessionSummary;

/// Print the counters of one round
pub fn print_summary<W: Write>(output: &mut W, summary: &SessionSummary) -> io::Result<()> {
    let dispatch = &summary.dispatch;

    if summary.nothing_uploaded() {
        writeln!(output, "No voice has been successfully uploaded.")?;
    }

    writeln!(
        output,
        "Uploads: {} attempted, {} accepted, {} failed, peak concurrency {}, {:.2?}",
        dispatch.attempted,
        dispatch.accepted,
        dispatch.failed + dispatch.duplicates,
        dispatch.peak_in_flight,
        dispatch.elapsed
    )?;

    if let Some(poll) = &summary.poll {
        writeln!(
            output,
            "Results: {} completed, {} undecodable, {} fetch errors, {} sweeps, {:.2?}",
            poll.completed, poll.decode_failures, poll.transport_failures, poll.sweeps, poll.elapsed
        )?;

        if !poll.abandoned.is_empty() {
            let ids: Vec<String> = poll.abandoned.iter().map(|id| id.to_string()).collect();
            writeln!(output, "Still pending: {}", ids.join(", "))?;
        }
    }

    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asr_loadgen_core::{DispatchReport, OperationId, PollReport};
    use std::time::Duration;

    fn dispatch(accepted: usize, failed: usize) -> DispatchReport {
        DispatchReport {
            attempted: accepted + failed,
            accepted,
            failed,
            duplicates: 0,
            peak_in_flight: 2,
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn test_nothing_uploaded() {
        let summary = SessionSummary {
            dispatch: dispatch(0, 5),
            poll: None,
        };
        let mut output = Vec::new();
        print_summary(&mut output, &summary).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("No voice has been successfully uploaded."));
        assert!(output.contains("5 attempted, 0 accepted, 5 failed"));
        assert!(!output.contains("Results:"));
    }

    #[test]
    fn test_abandoned_operations_listed() {
        let summary = SessionSummary {
            dispatch: dispatch(3, 0),
            poll: Some(PollReport {
                sweeps: 10,
                completed: 1,
                decode_failures: 0,
                transport_failures: 4,
                abandoned: vec![OperationId(17), OperationId(18)],
                elapsed: Duration::from_secs(10),
            }),
        };
        let mut output = Vec::new();
        print_summary(&mut output, &summary).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("1 completed, 0 undecodable, 4 fetch errors, 10 sweeps"));
        assert!(output.contains("Still pending: 17, 18"));
    }
}
