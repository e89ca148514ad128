use std::cmp::Ordering;

use anyhow::{anyhow, Result};

/// Compare dotted versions numerically. Missing parts count as zero and a
/// non-numeric suffix inside a part ("7.33.3-rc1") is ignored.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left_parts = version_parts(left);
    let right_parts = version_parts(right);
    let len = left_parts.len().max(right_parts.len());
    for i in 0..len {
        let l = left_parts.get(i).copied().unwrap_or(0);
        let r = right_parts.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn version_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| {
            let digits = part.chars().take_while(|c| c.is_ascii_digit()).collect::<String>();
            digits.parse::<u64>().unwrap_or(0)
        })
        .collect()
}

pub fn validate_minimum_version(product: &str, current: &str, minimum: &str) -> Result<()> {
    if compare_versions(current, minimum) == Ordering::Less {
        return Err(anyhow!(
            "This operation requires {} version {} or higher. The current version is {}",
            product,
            minimum,
            current
        ));
    }
    Ok(())
}
