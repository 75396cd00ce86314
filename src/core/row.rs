use serde::{Deserialize, Serialize};

/// One parsed record, split into type-homogeneous sequences by column order.
/// Timestamps stay as validated text; consumers re-parse with the stream's
/// date format, communicated out-of-band.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub numbers: Vec<f64>,
    pub texts: Vec<String>,
    pub timestamps: Vec<String>,
}
