use crate::errors::BalanceError;

/// A 2x2 table, indexed `[row][column]`. Index 0 is the "yes" level.
pub type Table2x2 = [[f64; 2]; 2];

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
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), BalanceError> {
    validate_float_parameter(value, 0.0, f64::MAX, parameter)
}

pub fn validate_probability(value: f64, parameter: &str) -> Result<(), BalanceError> {
    validate_float_parameter(value, 0.0, 1.0, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), BalanceError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(BalanceError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

#[inline]
pub fn row_sums(table: &Table2x2) -> [f64; 2] {
    [table[0][0] + table[0][1], table[1][0] + table[1][1]]
}

#[inline]
pub fn col_sums(table: &Table2x2) -> [f64; 2] {
    [table[0][0] + table[1][0], table[0][1] + table[1][1]]
}

#[inline]
pub fn table_sum(table: &Table2x2) -> f64 {
    table.iter().flatten().sum()
}

#[inline]
pub fn transpose(table: &Table2x2) -> Table2x2 {
    [[table[0][0], table[1][0]], [table[0][1], table[1][1]]]
}

#[inline]
pub fn scale(table: &Table2x2, factor: f64) -> Table2x2 {
    table.map(|row| row.map(|v| v * factor))
}
