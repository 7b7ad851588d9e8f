//! Localized display strings
//!
//! Only English ships today. Templates use positional `{0}`, `{1}` markers.

pub const LOCATION_OPEN: &str = "Open";
pub const LOCATION_CLOSED: &str = "Closed";
pub const LOCATION_CLOSED_TODAY: &str = "Closed today";
pub const LOCATION_SPECIAL_HOURS: &str = "Special Hours";
pub const LOCATION_TOMORROW: &str = "tomorrow";

/// `{0}` is the opening time
pub const LOCATION_OPENS_AT_ITEM: &str = "Opens at {0}";

/// `{0}` is the closing time
pub const LOCATION_OPEN_UNTIL_ITEM: &str = "Open until {0}";

/// `{0}` is "tomorrow" or an abbreviated day name, `{1}` the opening time
pub const LOCATION_OPENS_NEXT_ITEM: &str = "Opens {0} at {1}";

/// Substitute positional arguments into a template
///
/// Markers without a matching argument are left as-is.
pub fn format_item(template: &str, args: &[&str]) -> String {
    let mut output = template.to_string();
    for (index, arg) in args.iter().enumerate() {
        output = output.replace(&format!("{{{}}}", index), arg);
    }
    output
}
