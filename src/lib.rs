// Library module for testable functions

pub mod ingestion;

/// Calculate the current bid as a fraction of MSRP
/// Formula: current_bid / msrp, or 0 when msrp is not positive
pub fn calculate_bid_ratio(current_bid: f64, msrp: f64) -> f64 {
    if msrp > 0.0 {
        current_bid / msrp
    } else {
        0.0
    }
}
