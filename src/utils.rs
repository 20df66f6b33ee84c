use crate::errors::DecisionTreeError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), DecisionTreeError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(DecisionTreeError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Calculate if a value is missing.
/// NaN is always treated as missing, whatever the sentinel is.
#[inline]
pub fn is_missing(value: &f64, missing: &f64) -> bool {
    value.is_nan() || value == missing
}

/// One term of an entropy sum, `p * log2(p)`, taken as zero when `p` is zero.
#[inline]
pub fn plogp(count: usize, total: usize) -> f64 {
    if count == 0 || total == 0 {
        return 0.0;
    }
    let p = count as f64 / total as f64;
    p * p.log2()
}

/// Entropy in bits of a distribution given as raw counts.
pub fn entropy_from_counts(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    -counts.iter().map(|c| plogp(*c, total)).sum::<f64>()
}

/// Index of the largest count, ties going to the lowest index.
pub fn argmax_count(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, c) in counts.iter().enumerate() {
        if *c > counts[best] {
            best = i;
        }
    }
    best
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}
