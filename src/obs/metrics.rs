// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		match operation {
			Operation::Request =>
				metrics::counter!("busline_client_request_total", "outcome" => outcome.as_str())
					.increment(1),
			Operation::Refresh =>
				metrics::counter!("busline_client_refresh_total", "outcome" => outcome.as_str())
					.increment(1),
		}
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_noop_without_recorder() {
		record_outcome(Operation::Refresh, Outcome::Failure);
		record_outcome(Operation::Request, Outcome::Parked);
	}
}
