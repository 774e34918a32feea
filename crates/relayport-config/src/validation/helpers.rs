use std::ops::RangeInclusive;

/// Record `name` as invalid when `value` falls outside `range`.
pub(crate) fn validate_range(
    errors: &mut Vec<String>,
    name: &str,
    value: u32,
    range: RangeInclusive<u32>,
) {
    if !range.contains(&value) {
        errors.push(format!(
            "{name} = {value} is out of range [{}, {}]",
            range.start(),
            range.end()
        ));
    }
}
