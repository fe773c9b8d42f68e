//! Dimension-specific reduction of compare candidates, so a comparison stays
//! readable instead of plotting one line per raw filter value.

/// Known-bogus OS names submitted by a batch of broken builds; never worth a
/// line on a chart.
const SKIPPED_OS_NAMES: [&str; 2] = ["Windows_95", "Windows_98"];

/// Reduce the candidate values for `dimension`. Dimensions without a
/// heuristic pass through untouched.
pub fn sensible_filter_options(dimension: &str, values: Vec<String>) -> Vec<String> {
    match dimension {
        // OS versions arrive as "Name,version"; dozens of them collapse into
        // a handful of OS names.
        "os" => {
            let mut names: Vec<String> = Vec::new();
            for os_version in values {
                let name = os_version.split(',').next().unwrap_or("").to_string();
                if SKIPPED_OS_NAMES.contains(&name.as_str()) {
                    continue;
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        }
        // Keep only names that look like real applications: leading
        // uppercase, not a digit.
        "application" => values
            .into_iter()
            .filter(|name| name.chars().next().is_some_and(|c| c.is_uppercase()))
            .collect(),
        _ => values,
    }
}
