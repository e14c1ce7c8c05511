//! Outbound destination normalization

/// Normalize a dialed number: strip whitespace, `(`, `)` and `-`, then make
/// sure the result carries a leading `+`.
///
/// The normalized form is both dialed and recorded in the call log.
///
/// ```
/// use softphone_agent_core::number::normalize_destination;
///
/// assert_eq!(normalize_destination("+1 (555) 123-4567"), "+15551234567");
/// assert_eq!(normalize_destination("44 20 7946 0958"), "+442079460958");
/// ```
pub fn normalize_destination(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect();
    if digits.starts_with('+') {
        digits
    } else {
        format!("+{}", digits)
    }
}
